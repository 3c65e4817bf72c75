//! Command definitions for the pomotask CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomotask - focus sessions and task tracking from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "pomotask",
    version,
    about = "ポモドーロタイマー付きタスク管理CLI",
    long_about = "作業/休憩のフォーカスセッションを計測し、タスクAPIと連携します。\n\
                  認証トークンの期限切れは自動で更新されます。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Task API base URL (overrides POMOTASK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Credential file location
    #[arg(long, global = true, hide = true)]
    pub credential_file: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run an interactive focus session
    Timer(TimerArgs),

    /// Log in and store the access token
    Login(LoginArgs),

    /// Create an account
    Register(RegisterArgs),

    /// Forget the stored access token
    Logout,

    /// Manage tasks
    #[command(subcommand)]
    Tasks(TaskCommands),

    /// Manage categories
    #[command(subcommand)]
    Categories(CategoryCommands),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommands {
    /// List tasks
    List,
    /// Create a task
    Add(TaskAddArgs),
    /// Update a task
    Update(TaskUpdateArgs),
    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },
}

/// Category subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommands {
    /// List categories
    List,
    /// Create a category
    Add {
        /// Category name
        #[arg(value_parser = validate_name)]
        name: String,
    },
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for the timer command
#[derive(Args, Debug, Clone)]
pub struct TimerArgs {
    /// Work duration in minutes (1-120)
    #[arg(
        short,
        long,
        default_value = "25",
        value_parser = clap::value_parser!(u32).range(1..=120)
    )]
    pub work: u32,

    /// Break duration in minutes (1-60)
    #[arg(
        short,
        long,
        default_value = "5",
        value_parser = clap::value_parser!(u32).range(1..=60)
    )]
    pub break_time: u32,

    /// Task name shown during the session
    #[arg(short, long, value_parser = validate_name)]
    pub task: Option<String>,
}

impl Default for TimerArgs {
    fn default() -> Self {
        Self {
            work: 25,
            break_time: 5,
            task: None,
        }
    }
}

/// Arguments for the login command
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long)]
    pub username: String,

    /// Password
    #[arg(short, long)]
    pub password: String,
}

/// Arguments for the register command
#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Username
    #[arg(short, long)]
    pub username: String,

    /// Email address
    #[arg(short, long)]
    pub email: String,

    /// Password
    #[arg(short, long)]
    pub password: String,
}

/// Arguments for creating a task
#[derive(Args, Debug, Clone)]
pub struct TaskAddArgs {
    /// Task name
    #[arg(value_parser = validate_name)]
    pub name: String,

    /// Task description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Planned focus sessions (1-20)
    #[arg(
        short = 'n',
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub pomodoros: u32,

    /// Category ID
    #[arg(short, long, default_value = "1")]
    pub category: i64,
}

/// Arguments for updating a task
#[derive(Args, Debug, Clone)]
pub struct TaskUpdateArgs {
    /// Task ID
    pub id: i64,

    /// New name
    #[arg(long, value_parser = validate_name)]
    pub name: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New planned focus sessions (1-20)
    #[arg(
        short = 'n',
        long,
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub pomodoros: Option<u32>,

    /// New category ID
    #[arg(short, long)]
    pub category: Option<i64>,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates a task or category name.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_name(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("名前は空にできません".to_string());
    }
    if s.chars().count() > 100 {
        return Err("名前は100文字以内にしてください".to_string());
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================
