//! Session termination command.

use clap::Args;

use checkuser_core::error::AppError;
use checkuser_server::app;

use crate::output::{self, OutputFormat};

/// Arguments for the kill command
#[derive(Debug, Args)]
pub struct KillArgs {
    /// User whose sessions are terminated
    pub username: String,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Execute the kill command
pub async fn execute(
    args: &KillArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Terminate ALL sessions of '{}'?", args.username))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let config = super::load_config(config_path)?;
    let outcome = app::build_checker(&config).kill(&args.username).await;

    match format {
        OutputFormat::Json => output::print_json(&outcome),
        OutputFormat::Table => match outcome.error {
            None => output::print_success(&format!("Sessions of '{}' terminated", args.username)),
            Some(ref e) => output::print_warning(&format!(
                "Sessions of '{}' partly terminated: {}",
                args.username, e
            )),
        },
    }

    Ok(())
}
