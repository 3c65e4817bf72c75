//! Session runner that drives the timer engine on a one-second cadence.
//!
//! The runner is the only owner of the engine. Controls arrive over a
//! command channel and ticks come from a `tokio::time::Interval` that exists
//! only while the engine is running, so a pause or reset drops the pending
//! tick before anything else can observe it.

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use crate::timer::engine::{TimerEngine, TimerEvent};
use crate::types::{SessionConfig, TimerState};

/// Tick cadence.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

// ============================================================================
// TimerCommand
// ============================================================================

/// Control inputs accepted by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Resume,
    Reset,
}

// ============================================================================
// TimerHandle
// ============================================================================

/// Cloneable handle for controlling a running session and reading its state.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<TimerCommand>,
    snapshots: watch::Receiver<TimerState>,
}

impl TimerHandle {
    /// Starts the countdown.
    pub fn start(&self) -> Result<()> {
        self.send(TimerCommand::Start)
    }

    /// Pauses the countdown.
    pub fn pause(&self) -> Result<()> {
        self.send(TimerCommand::Pause)
    }

    /// Resumes a paused countdown.
    pub fn resume(&self) -> Result<()> {
        self.send(TimerCommand::Resume)
    }

    /// Resets to an idle work session.
    pub fn reset(&self) -> Result<()> {
        self.send(TimerCommand::Reset)
    }

    /// Returns the latest published state.
    pub fn state(&self) -> TimerState {
        self.snapshots.borrow().clone()
    }

    /// Waits until the runner publishes a new state.
    ///
    /// # Errors
    ///
    /// Returns an error once the runner has stopped.
    pub async fn changed(&mut self) -> Result<TimerState> {
        self.snapshots
            .changed()
            .await
            .context("タイマーが停止しています")?;
        Ok(self.snapshots.borrow_and_update().clone())
    }

    fn send(&self, command: TimerCommand) -> Result<()> {
        self.commands
            .send(command)
            .context("タイマーが停止しています")
    }
}

// ============================================================================
// SessionRunner
// ============================================================================

enum Step {
    Command(Option<TimerCommand>),
    Tick,
}

/// Drives a [`TimerEngine`] until every [`TimerHandle`] is dropped.
pub struct SessionRunner {
    engine: TimerEngine,
    commands: mpsc::UnboundedReceiver<TimerCommand>,
    snapshots: watch::Sender<TimerState>,
    period: Duration,
}

impl SessionRunner {
    /// Creates a runner and the handle that controls it.
    pub fn new(
        config: SessionConfig,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> (Self, TimerHandle) {
        let engine = TimerEngine::new(config, event_tx);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.get_state().clone());

        let runner = Self {
            engine,
            commands: command_rx,
            snapshots: snapshot_tx,
            period: TICK_PERIOD,
        };
        let handle = TimerHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        (runner, handle)
    }

    /// Runs the control/tick loop.
    ///
    /// Returns when the command channel closes.
    pub async fn run(mut self) {
        let mut ticker: Option<Interval> = None;

        loop {
            let step = tokio::select! {
                biased;
                command = self.commands.recv() => Step::Command(command),
                () = next_tick(&mut ticker) => Step::Tick,
            };

            match step {
                Step::Command(None) => break,
                Step::Command(Some(command)) => {
                    let was_running = self.engine.get_state().is_running();
                    self.apply(command);

                    if !self.engine.get_state().is_running() {
                        ticker = None;
                    } else if !was_running {
                        ticker = Some(self.new_ticker());
                    }
                }
                Step::Tick => {
                    self.engine.tick();
                    if !self.engine.get_state().is_running() {
                        ticker = None;
                    }
                }
            }

            self.snapshots.send_replace(self.engine.get_state().clone());
        }

        tracing::debug!("session runner stopped");
    }

    fn apply(&mut self, command: TimerCommand) {
        tracing::debug!(?command, "timer command");
        match command {
            TimerCommand::Start => {
                self.engine.start();
            }
            TimerCommand::Pause => {
                self.engine.pause();
            }
            TimerCommand::Resume => {
                self.engine.resume();
            }
            TimerCommand::Reset => self.engine.reset(),
        }
    }

    /// First tick lands one full period after (re)start.
    fn new_ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Spawns a runner on the current tokio runtime.
///
/// Returns the control handle, the completion event stream, and the task.
pub fn spawn_session(
    config: SessionConfig,
) -> (
    TimerHandle,
    mpsc::UnboundedReceiver<TimerEvent>,
    JoinHandle<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (runner, handle) = SessionRunner::new(config, event_tx);
    let task = tokio::spawn(runner.run());
    (handle, event_rx, task)
}

// ============================================================================
// Tests
// ============================================================================
