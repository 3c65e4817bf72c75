//! Core data types for the focus session client.
//!
//! This module defines the data structures used for:
//! - Timer phase/status and the countdown state machine
//! - Session duration configuration with validation
//! - The bearer credential shared by the request pipeline

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// TimerPhase
// ============================================================================

/// Which interval type the session is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Focused work interval
    #[default]
    Work,
    /// Break interval
    Break,
}

impl TimerPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Work => "work",
            TimerPhase::Break => "break",
        }
    }

    /// Returns the phase that follows this one.
    pub fn next(&self) -> Self {
        match self {
            TimerPhase::Work => TimerPhase::Break,
            TimerPhase::Break => TimerPhase::Work,
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TimerStatus
// ============================================================================

/// Whether the countdown is idle, ticking, or held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// Not started, or the previous phase just completed
    #[default]
    Idle,
    /// Counting down once per second
    Running,
    /// Held with the remaining time preserved
    Paused,
}

impl TimerStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        }
    }
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Default work interval in seconds (25 minutes).
pub const DEFAULT_WORK_SECONDS: u32 = 25 * 60;

/// Default break interval in seconds (5 minutes).
pub const DEFAULT_BREAK_SECONDS: u32 = 5 * 60;

/// Interval durations for the focus session cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Work duration in seconds (1-7200)
    pub work_seconds: u32,
    /// Break duration in seconds (1-3600)
    pub break_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_seconds: DEFAULT_WORK_SECONDS,
            break_seconds: DEFAULT_BREAK_SECONDS,
        }
    }
}

impl SessionConfig {
    /// Returns a configuration with the specified work duration.
    pub fn with_work_seconds(mut self, seconds: u32) -> Self {
        self.work_seconds = seconds;
        self
    }

    /// Returns a configuration with the specified break duration.
    pub fn with_break_seconds(mut self, seconds: u32) -> Self {
        self.break_seconds = seconds;
        self
    }

    /// Full duration of the given phase in seconds.
    pub fn duration_of(&self, phase: TimerPhase) -> u32 {
        match phase {
            TimerPhase::Work => self.work_seconds,
            TimerPhase::Break => self.break_seconds,
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.work_seconds < 1 || self.work_seconds > 7200 {
            return Err("作業時間は1-7200秒の範囲で指定してください".to_string());
        }
        if self.break_seconds < 1 || self.break_seconds > 3600 {
            return Err("休憩時間は1-3600秒の範囲で指定してください".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The countdown state machine.
///
/// `phase`, `status` and `remaining_seconds` are the only source of truth;
/// every transition goes through the methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Interval currently loaded
    pub phase: TimerPhase,
    /// Idle, running or paused
    pub status: TimerStatus,
    /// Remaining seconds in the current phase
    pub remaining_seconds: u32,
    /// Interval durations
    pub config: SessionConfig,
}

impl TimerState {
    /// Creates an idle work session with the full work duration loaded.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            phase: TimerPhase::Work,
            status: TimerStatus::Idle,
            remaining_seconds: config.work_seconds,
            config,
        }
    }

    /// Starts the countdown.
    ///
    /// Starting a paused session continues from the preserved time.
    /// Returns false if the timer was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    /// Pauses the countdown. Only works if the timer is running.
    pub fn pause(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    /// Resumes a paused countdown. Only works if the timer is paused.
    pub fn resume(&mut self) -> bool {
        if !self.is_paused() {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    /// Returns to an idle work session with the full work duration.
    pub fn reset(&mut self) {
        self.phase = TimerPhase::Work;
        self.status = TimerStatus::Idle;
        self.remaining_seconds = self.config.work_seconds;
    }

    /// Decrements the countdown by one second.
    ///
    /// When the countdown reaches zero the other phase is loaded with its
    /// full duration, the timer goes idle, and the finished phase is
    /// returned. Does nothing unless running.
    pub fn tick(&mut self) -> Option<TimerPhase> {
        if !self.is_running() {
            return None;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return None;
        }

        let finished = self.phase;
        self.phase = finished.next();
        self.remaining_seconds = self.config.duration_of(self.phase);
        self.status = TimerStatus::Idle;
        Some(finished)
    }

    /// Full duration of the current phase.
    pub fn current_duration(&self) -> u32 {
        self.config.duration_of(self.phase)
    }

    /// Elapsed share of the current phase, 0.0 to 100.0.
    pub fn progress_percent(&self) -> f64 {
        let duration = self.current_duration();
        if duration == 0 {
            return 0.0;
        }
        let elapsed = duration.saturating_sub(self.remaining_seconds);
        f64::from(elapsed) / f64::from(duration) * 100.0
    }

    /// Returns true if the timer is actively counting down.
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Returns true if the timer is paused.
    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    /// Returns true if the timer is idle.
    pub fn is_idle(&self) -> bool {
        self.status == TimerStatus::Idle
    }
}

// ============================================================================
// Credential
// ============================================================================

/// Opaque bearer token for authenticated API calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token sent as `Authorization: Bearer <token>`
    pub access_token: String,
}

impl Credential {
    /// Creates a credential from an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    /// Returns the `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Keep tokens out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
