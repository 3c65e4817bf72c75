//! Timer engine for focus sessions.
//!
//! This module provides the synchronous countdown engine:
//! - Start/pause/resume/reset controls (invalid calls are no-ops)
//! - A single `tick()` transition driven by the session runner
//! - `SessionComplete` events at every phase boundary

use tokio::sync::mpsc;

use crate::types::{SessionConfig, TimerPhase, TimerState};

// ============================================================================
// TimerEvent
// ============================================================================

/// Events emitted by the timer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A phase counted down to zero
    SessionComplete {
        /// The phase that just finished
        phase: TimerPhase,
    },
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that owns the session state and emits completion events.
pub struct TimerEngine {
    /// Current timer state
    state: TimerState,
    /// Event sender channel
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates an idle engine with the given durations and event channel.
    pub fn new(config: SessionConfig, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self {
            state: TimerState::new(config),
            event_tx,
        }
    }

    /// Starts (or continues) the countdown.
    ///
    /// Returns false when the timer was already running.
    pub fn start(&mut self) -> bool {
        let started = self.state.start();
        if started {
            tracing::debug!(
                phase = %self.state.phase,
                remaining = self.state.remaining_seconds,
                "timer started"
            );
        }
        started
    }

    /// Pauses a running countdown.
    pub fn pause(&mut self) -> bool {
        let paused = self.state.pause();
        if paused {
            tracing::debug!(remaining = self.state.remaining_seconds, "timer paused");
        }
        paused
    }

    /// Resumes a paused countdown.
    pub fn resume(&mut self) -> bool {
        let resumed = self.state.resume();
        if resumed {
            tracing::debug!(remaining = self.state.remaining_seconds, "timer resumed");
        }
        resumed
    }

    /// Returns to an idle work session.
    pub fn reset(&mut self) {
        self.state.reset();
        tracing::debug!("timer reset");
    }

    /// Advances the countdown by one second.
    ///
    /// Emits `SessionComplete` and returns the finished phase when the
    /// countdown reaches zero.
    pub fn tick(&mut self) -> Option<TimerPhase> {
        let finished = self.state.tick()?;

        tracing::info!(phase = %finished, next = %self.state.phase, "session complete");
        if self
            .event_tx
            .send(TimerEvent::SessionComplete { phase: finished })
            .is_err()
        {
            tracing::debug!("no listener for session complete event");
        }

        Some(finished)
    }

    /// Elapsed share of the current phase, 0.0 to 100.0.
    pub fn progress_percent(&self) -> f64 {
        self.state.progress_percent()
    }

    /// Returns a reference to the current timer state.
    pub fn get_state(&self) -> &TimerState {
        &self.state
    }

    /// Returns a mutable reference to the timer state (for testing).
    #[cfg(test)]
    pub fn get_state_mut(&mut self) -> &mut TimerState {
        &mut self.state
    }
}

// ============================================================================
// Tests
// ============================================================================
