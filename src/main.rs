//! Pomotask - focus sessions and task tracking from the terminal
//!
//! - Work/break countdown driven by an interactive timer
//! - Task and category management against the task API
//! - Expired access tokens are renewed once and the request replayed

use clap::Parser;

use pomotask::cli::{execute, Cli, Display};
use pomotask::{ApiError, PipelineError};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    let code = match execute(cli).await {
        Ok(()) => 0,
        Err(e) => {
            report_error(&e);
            1
        }
    };

    // Exit without joining blocked stdin reader threads.
    std::process::exit(code);
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects `debug`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Prints an error with a hint when one is known.
fn report_error(error: &anyhow::Error) {
    let pipeline_error = match error.downcast_ref::<ApiError>() {
        Some(ApiError::Pipeline(e)) => Some(e),
        _ => error.downcast_ref::<PipelineError>(),
    };

    match pipeline_error {
        // The re-login hint was already shown when the session ended.
        Some(PipelineError::SessionExpired) => {}
        Some(e) => Display::show_error_with_suggestion(&e.to_string(), Some(e.suggestion())),
        None => Display::show_error(&format!("{:#}", error)),
    }
}
