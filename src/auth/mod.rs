//! Authenticated request pipeline.
//!
//! This module makes every outbound API call implicitly authenticated and
//! survives a single credential expiry per call:
//!
//! - `store`: where the bearer credential lives
//! - `transport`: requests/responses as data and the HTTP round-trip
//! - `pipeline`: credential attachment, shared renewal, one replay
//! - `error`: the failure taxonomy callers see
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pomotask::auth::{ApiRequest, AuthPipeline, MemoryCredentialStore, ReqwestTransport};
//! use pomotask::config::ApiConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(ReqwestTransport::new(&ApiConfig::default())?);
//! let store = Arc::new(MemoryCredentialStore::new());
//! let pipeline = AuthPipeline::new(transport, store);
//!
//! match pipeline.execute(ApiRequest::get("/tasks")).await {
//!     Ok(response) => println!("{}", response.body),
//!     Err(e) if e.is_session_expired() => println!("please log in again"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod pipeline;
pub mod store;
pub mod transport;

pub use error::{PipelineError, RenewalFailure, TransportError};
pub use pipeline::{AuthPipeline, PendingRequest, SessionSignal};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, MockTransport, ReqwestTransport};
