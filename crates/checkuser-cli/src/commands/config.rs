//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use checkuser_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            match format {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => println!("{:#?}", config),
            }
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{}' is valid", config_path));
                output::print_kv("Server", &config.server.bind_addr());
                output::print_kv("Workers", &config.server.workers.to_string());
                output::print_kv("Limit file", &config.checker.limit_file.display().to_string());
                output::print_kv("OpenVPN management", &config.checker.openvpn.addr());
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to create dir: {}", e)))?;
            }

            tokio::fs::write(out_path, default_config)
                .await
                .map_err(|e| AppError::internal(format!("Failed to write config: {}", e)))?;

            output::print_success(&format!("Default config written to '{}'", out_path));
        }
    }

    Ok(())
}
