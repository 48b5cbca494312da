use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdesk_infrastructure::{ConfigService, TaskdeskPaths};

mod commands;
mod logging;

use commands::{
    ConfigAction, NotificationAction, TaskAction, auth, config, notifications, tasks, users,
};

#[derive(Parser)]
#[command(name = "taskdesk")]
#[command(about = "Taskdesk CLI - tasks and notifications from the CRM backend", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily rolling file in the config directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Use this directory instead of the platform config directory
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,
        /// Read from TASKDESK_PASSWORD or prompted when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget stored credentials
    Logout,
    /// Restore the stored session and show who is signed in
    Status,
    /// Work with your tasks
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Read and acknowledge notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },
    /// List the members of your organisation
    Users,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = TaskdeskPaths::new(cli.config_dir.clone())?;
    let config_service = ConfigService::new(paths.clone());

    // A broken config file must not prevent `config init` from repairing it.
    let log_dir = match config_service.get_config() {
        Ok(config) if cli.log_file => Some(config.log_dir.unwrap_or_else(|| paths.log_dir())),
        Ok(config) => config.log_dir,
        Err(_) if cli.log_file => Some(paths.log_dir()),
        Err(_) => None,
    };
    let _guard = logging::init(cli.verbose, log_dir.as_deref())?;

    match cli.command {
        Commands::Login { email, password } => {
            auth::login(&config_service, &email, password).await?
        }
        Commands::Logout => auth::logout(&config_service).await?,
        Commands::Status => auth::status(&config_service).await?,
        Commands::Tasks { action } => tasks::run(&config_service, action).await?,
        Commands::Notifications { action } => notifications::run(&config_service, action).await?,
        Commands::Users => users::list(&config_service).await?,
        Commands::Config { action } => config::run(&config_service, action)?,
    }

    Ok(())
}
