//! CLI command definitions and dispatch.

pub mod check;
pub mod config;
pub mod count;
pub mod kill;
pub mod serve;

use clap::{Parser, Subcommand};

use checkuser_core::config::{AppConfig, DEFAULT_CONFIG_PATH};
use checkuser_core::error::AppError;

use crate::output::OutputFormat;

/// CheckUser: SSH and OpenVPN session control
#[derive(Debug, Parser)]
#[command(name = "checkuser", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the request server
    Serve(serve::ServeArgs),
    /// Report sessions, limit, and expiry of users
    Check(check::CheckArgs),
    /// Terminate every session of a user
    Kill(kill::KillArgs),
    /// Count sessions across all accounts
    Count,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Whether logging is set up from the `[logging]` config section
    /// instead of the CLI's quiet stderr default.
    pub fn uses_config_logging(&self) -> bool {
        matches!(self.command, Commands::Serve(_))
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Serve(args) => serve::execute(args, &self.config).await,
            Commands::Check(args) => check::execute(args, &self.config, self.format).await,
            Commands::Kill(args) => kill::execute(args, &self.config, self.format).await,
            Commands::Count => count::execute(&self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file and environment
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}
