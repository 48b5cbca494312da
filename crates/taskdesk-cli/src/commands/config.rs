use anyhow::{Context, Result};
use clap::Subcommand;
use taskdesk_infrastructure::ConfigService;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a default config.toml
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration, environment overrides included
    Show,
    /// Print the Taskdesk directory paths
    Path,
}

pub fn run(config_service: &ConfigService, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let (path, written) = config_service
                .init_default(force)
                .context("Failed to write default configuration")?;
            if written {
                println!("✅ Wrote {}", path.display());
            } else {
                println!("Config already exists at {} (use --force to replace it)", path.display());
            }
        }
        ConfigAction::Show => {
            let config = config_service.get_config().context("Failed to load configuration")?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            let paths = config_service.paths();
            println!("root:        {}", paths.root().display());
            println!("config:      {}", paths.config_file().display());
            if let Ok(config) = config_service.get_config() {
                println!("credentials: {}", config_service.credentials_path(&config).display());
            } else {
                println!("credentials: {}", paths.credentials_file().display());
            }
            println!("logs:        {}", paths.log_dir().display());
        }
    }
    Ok(())
}
