//! Pomotask Library
//!
//! This library provides the core functionality for the pomotask CLI.
//! It includes:
//! - Timer engine and runner for work/break focus sessions
//! - Authenticated request pipeline with shared credential renewal
//! - Typed client for the task and category API
//! - Configuration and credential storage
//! - CLI command parsing and display utilities

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{Credential, SessionConfig, TimerPhase, TimerState, TimerStatus};

pub use timer::{spawn_session, TimerEngine, TimerEvent, TimerHandle};

pub use auth::{
    ApiRequest, ApiResponse, AuthPipeline, CredentialStore, FileCredentialStore, HttpTransport,
    MemoryCredentialStore, PipelineError, ReqwestTransport, SessionSignal,
};

pub use api::{ApiError, TaskClient};
pub use config::{ApiConfig, AppConfig, ConfigError};
