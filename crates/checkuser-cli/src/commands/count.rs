//! Aggregate session count command.

use checkuser_core::error::AppError;
use checkuser_core::types::ConnectionTotal;
use checkuser_server::app;

use crate::output::{self, OutputFormat};

/// Execute the count command
pub async fn execute(config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let count = app::build_checker(&config).count_all().await?;

    match format {
        OutputFormat::Json => output::print_json(&ConnectionTotal::ok(count)),
        OutputFormat::Table => println!("Active connections: {}", count),
    }

    Ok(())
}
