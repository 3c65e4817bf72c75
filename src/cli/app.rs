//! Command dispatch for the pomotask CLI.
//!
//! Builds the collaborators from configuration and routes each subcommand
//! to the timer or the task API.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::CommandFactory;
use tokio::sync::broadcast;

use super::commands::{CategoryCommands, Cli, Commands, TaskAddArgs, TaskCommands, TaskUpdateArgs};
use super::display::Display;
use super::session;
use crate::api::{NewTask, Registration, TaskClient, TaskUpdate};
use crate::auth::{AuthPipeline, FileCredentialStore, ReqwestTransport, SessionSignal};
use crate::config::{ApiConfig, AppConfig};

/// Client type used by the CLI.
pub type CliClient = TaskClient<ReqwestTransport, FileCredentialStore>;

/// Resolves the configuration from the environment and global flags.
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut api = ApiConfig::from_env();
    if let Some(url) = &cli.api_url {
        api = api.with_base_url(url.trim());
    }
    let config = AppConfig::new(api, cli.credential_file.clone())?;
    tracing::debug!(
        base_url = %config.api.base_url,
        credential_path = %config.credential_path.display(),
        "configuration loaded"
    );
    Ok(config)
}

/// Builds the task client over a file-backed credential store.
pub fn build_client(config: &AppConfig) -> Result<CliClient> {
    let transport = ReqwestTransport::new(&config.api).context("HTTPクライアントの初期化に失敗しました")?;
    let store = FileCredentialStore::open(&config.credential_path);
    let pipeline = AuthPipeline::with_refresh_path(
        Arc::new(transport),
        Arc::new(store),
        &config.api.refresh_path,
    );
    Ok(TaskClient::new(pipeline))
}

/// Executes the CLI command.
pub async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let command = match cli.command.clone() {
        Some(command) => command,
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    match command {
        Commands::Timer(args) => session::run_timer(&args).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        command => {
            let config = load_config(&cli)?;
            let client = build_client(&config)?;
            let mut signals = client.pipeline().subscribe();
            let result = execute_api(&client, command).await;
            report_signals(&mut signals);
            result
        }
    }
}

async fn execute_api(client: &CliClient, command: Commands) -> Result<()> {
    match command {
        Commands::Login(args) => {
            client.login(&args.username, &args.password).await?;
            Display::show_login_success(&args.username);
        }
        Commands::Register(args) => {
            let registration = Registration {
                username: args.username,
                email: args.email,
                password: args.password,
            };
            client.register(&registration).await?;
            Display::show_register_success(&registration.username);
        }
        Commands::Logout => {
            client.logout();
            Display::show_logout_success();
        }
        Commands::Tasks(TaskCommands::List) => {
            let tasks = client.list_tasks().await?;
            Display::show_tasks(&tasks);
        }
        Commands::Tasks(TaskCommands::Add(args)) => {
            let task = client.create_task(&new_task(args)).await?;
            Display::show_task_saved(&task);
        }
        Commands::Tasks(TaskCommands::Update(args)) => {
            let (task_id, update) = task_update(args);
            if update.is_empty() {
                anyhow::bail!("更新する項目を指定してください");
            }
            let task = client.update_task(task_id, &update).await?;
            Display::show_task_saved(&task);
        }
        Commands::Tasks(TaskCommands::Delete { id }) => {
            client.delete_task(id).await?;
            Display::show_task_deleted(id);
        }
        Commands::Categories(CategoryCommands::List) => {
            let categories = client.list_categories().await?;
            Display::show_categories(&categories);
        }
        Commands::Categories(CategoryCommands::Add { name }) => {
            let category = client.create_category(&name).await?;
            Display::show_category_created(&category);
        }
        // Local commands; dispatched in `execute`.
        Commands::Timer(_) | Commands::Completions { .. } => {}
    }
    Ok(())
}

/// Surfaces session signals emitted while the command ran.
fn report_signals(signals: &mut broadcast::Receiver<SessionSignal>) {
    while let Ok(signal) = signals.try_recv() {
        match signal {
            SessionSignal::Renewed => tracing::info!("access token renewed"),
            SessionSignal::Expired => Display::show_session_expired(),
        }
    }
}

fn new_task(args: TaskAddArgs) -> NewTask {
    NewTask {
        description: args.description,
        pomodoro_count: args.pomodoros,
        category_id: args.category,
        ..NewTask::new(args.name)
    }
}

fn task_update(args: TaskUpdateArgs) -> (i64, TaskUpdate) {
    let update = TaskUpdate {
        name: args.name,
        description: args.description,
        pomodoro_count: args.pomodoros,
        category_id: args.category,
    };
    (args.id, update)
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
