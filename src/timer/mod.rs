//! Focus session timer.
//!
//! This module contains the countdown machinery:
//! - `engine`: the work/break state machine with completion events
//! - `runner`: the tokio task that feeds the engine one tick per second

pub mod engine;
pub mod runner;

pub use engine::{TimerEngine, TimerEvent};
pub use runner::{spawn_session, SessionRunner, TimerCommand, TimerHandle, TICK_PERIOD};
