//! CLI module for pomotask.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `app`: Configuration loading and command dispatch
//! - `session`: The interactive focus timer
//! - `display`: Output formatting and display logic

pub mod app;
pub mod commands;
pub mod display;
pub mod session;

pub use app::{build_client, execute, load_config, CliClient};
pub use commands::{CategoryCommands, Cli, Commands, TaskCommands, TimerArgs};
pub use display::Display;
pub use session::{run_timer, TimerInput};
