//! Display utilities for the pomotask CLI.
//!
//! This module provides formatted output for:
//! - Timer progress and session completion
//! - Task and category listings
//! - Success and error messages

use std::io::Write;

use crate::api::{Category, Task};
use crate::types::{TimerPhase, TimerState, TimerStatus};

/// Width of the progress bar in characters.
const BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the key bindings of the interactive timer.
    pub fn show_timer_help(task_name: Option<&str>) {
        println!("ポモドーロタイマー");
        println!("─────────────────────────────");
        if let Some(task) = task_name {
            println!("タスク: {}", task);
        }
        println!("操作: s=開始 p=一時停止 r=再開 x=リセット q=終了 (入力後Enter)");
    }

    /// Redraws the single timer status line.
    pub fn show_timer_line(state: &TimerState) {
        print!("\r\x1b[2K{}", Self::format_timer_line(state));
        let _ = std::io::stdout().flush();
    }

    /// Shows the banner for a finished session.
    pub fn show_session_complete(finished: TimerPhase, completed_work_sessions: u32) {
        println!();
        match finished {
            TimerPhase::Work => {
                println!("* 作業セッションが完了しました (#{})", completed_work_sessions);
                println!("  休憩を始めるには s を入力してください");
            }
            TimerPhase::Break => {
                println!("* 休憩が終わりました");
                println!("  次の作業を始めるには s を入力してください");
            }
        }
    }

    /// Shows a message for an unrecognised key.
    pub fn show_unknown_input(input: &str) {
        println!();
        println!("不明な入力です: {} (s/p/r/x/q)", input);
    }

    /// Shows the summary when the timer is closed.
    pub fn show_timer_summary(completed_work_sessions: u32) {
        println!();
        println!("[] タイマーを終了しました (完了した作業セッション: {})", completed_work_sessions);
    }

    /// Shows a success message for login.
    pub fn show_login_success(username: &str) {
        println!("* ログインしました: {}", username);
    }

    /// Shows a success message for registration.
    pub fn show_register_success(username: &str) {
        println!("* アカウントを作成しました: {}", username);
        println!("  'pomotask login' でログインしてください");
    }

    /// Shows a success message for logout.
    pub fn show_logout_success() {
        println!("* ログアウトしました");
    }

    /// Shows the task list.
    pub fn show_tasks(tasks: &[Task]) {
        if tasks.is_empty() {
            println!("タスクはありません");
            return;
        }
        println!("{:>5}  {:>4}  {:>5}  名前", "ID", "予定", "分類");
        println!("─────────────────────────────");
        for task in tasks {
            println!("{}", Self::format_task_row(task));
        }
    }

    /// Shows a single task after creation or update.
    pub fn show_task_saved(task: &Task) {
        println!("* タスクを保存しました");
        println!("{}", Self::format_task_row(task));
        if let Some(description) = &task.description {
            println!("  説明: {}", description);
        }
    }

    /// Shows a success message for task deletion.
    pub fn show_task_deleted(task_id: i64) {
        println!("* タスク #{} を削除しました", task_id);
    }

    /// Shows the category list.
    pub fn show_categories(categories: &[Category]) {
        if categories.is_empty() {
            println!("カテゴリはありません");
            return;
        }
        for category in categories {
            println!("{:>5}  {}", category.category_id, category.name);
        }
    }

    /// Shows a success message for category creation.
    pub fn show_category_created(category: &Category) {
        println!("* カテゴリを作成しました: #{} {}", category.category_id, category.name);
    }

    /// Shows the hint after the session has expired.
    pub fn show_session_expired() {
        eprintln!("セッションの有効期限が切れました");
        eprintln!("'pomotask login' で再度ログインしてください");
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Shows an error message with an optional suggestion.
    pub fn show_error_with_suggestion(message: &str, suggestion: Option<&str>) {
        Self::show_error(message);
        if let Some(suggestion) = suggestion {
            eprintln!("  {}", suggestion);
        }
    }

    // ------------------------------------------------------------------------
    // Formatting
    // ------------------------------------------------------------------------

    /// Formats remaining seconds as (minutes, seconds).
    fn format_time(total_seconds: u32) -> (u32, u32) {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        (minutes, seconds)
    }

    fn phase_label(phase: TimerPhase) -> &'static str {
        match phase {
            TimerPhase::Work => "作業",
            TimerPhase::Break => "休憩",
        }
    }

    fn status_label(status: TimerStatus) -> &'static str {
        match status {
            TimerStatus::Idle => "待機中",
            TimerStatus::Running => "実行中",
            TimerStatus::Paused => "一時停止中",
        }
    }

    fn format_timer_line(state: &TimerState) -> String {
        let (minutes, seconds) = Self::format_time(state.remaining_seconds);
        let percent = state.progress_percent();
        format!(
            "[{}] {:02}:{:02} {} {:>3.0}% {}",
            Self::phase_label(state.phase),
            minutes,
            seconds,
            Self::progress_bar(percent),
            percent,
            Self::status_label(state.status),
        )
    }

    fn progress_bar(percent: f64) -> String {
        let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
        let filled = filled.min(BAR_WIDTH);
        format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
    }

    fn format_task_row(task: &Task) -> String {
        format!(
            "{:>5}  {:>4}  {:>5}  {}",
            task.task_id, task.pomodoro_count, task.category_id, task.name
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
