//! Interactive focus session in the terminal.
//!
//! Reads one key per line from stdin and redraws the status line whenever
//! the runner publishes a new state.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::commands::TimerArgs;
use super::display::Display;
use crate::timer::{spawn_session, TimerEvent};
use crate::types::{SessionConfig, TimerPhase, TimerState};

/// Keys accepted by the interactive timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerInput {
    Start,
    Pause,
    Resume,
    Reset,
    Quit,
}

impl TimerInput {
    /// Parses a line of user input. Blank lines and unknown keys yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "s" | "start" => Some(Self::Start),
            "p" | "pause" => Some(Self::Pause),
            "r" | "resume" => Some(Self::Resume),
            "x" | "reset" => Some(Self::Reset),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Builds the session configuration from minute-based arguments.
pub fn session_config(args: &TimerArgs) -> Result<SessionConfig> {
    let config = SessionConfig::default()
        .with_work_seconds(args.work * 60)
        .with_break_seconds(args.break_time * 60);
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

enum Step {
    Input(Option<String>),
    State(TimerState),
    Completed(TimerEvent),
    Interrupted,
}

/// Runs the interactive timer until the user quits, stdin closes or
/// Ctrl+C is pressed.
pub async fn run_timer(args: &TimerArgs) -> Result<()> {
    let config = session_config(args)?;
    let (mut handle, mut events, task) = spawn_session(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut completed_work_sessions = 0u32;

    Display::show_timer_help(args.task.as_deref());
    Display::show_timer_line(&handle.state());

    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Input(line.context("入力の読み込みに失敗しました")?),
            state = handle.changed() => Step::State(state?),
            Some(event) = events.recv() => Step::Completed(event),
            _ = tokio::signal::ctrl_c() => Step::Interrupted,
        };

        match step {
            Step::Input(None) | Step::Interrupted => break,
            Step::Input(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match TimerInput::parse(&line) {
                    Some(TimerInput::Start) => handle.start()?,
                    Some(TimerInput::Pause) => handle.pause()?,
                    Some(TimerInput::Resume) => handle.resume()?,
                    Some(TimerInput::Reset) => handle.reset()?,
                    Some(TimerInput::Quit) => break,
                    None => Display::show_unknown_input(line.trim()),
                }
            }
            Step::State(state) => Display::show_timer_line(&state),
            Step::Completed(TimerEvent::SessionComplete { phase }) => {
                if phase == TimerPhase::Work {
                    completed_work_sessions += 1;
                }
                Display::show_session_complete(phase, completed_work_sessions);
            }
        }
    }

    drop(handle);
    task.await.context("タイマーの終了待ちに失敗しました")?;
    Display::show_timer_summary(completed_work_sessions);
    Ok(())
}
