//! CheckUser server: SSH and OpenVPN session control plane.
//!
//! Main entry point that loads configuration, sets up logging, and runs
//! the request server until Ctrl+C or SIGTERM.

use tokio::sync::watch;
use tracing;

use checkuser_core::config::{AppConfig, DEFAULT_CONFIG_PATH};
use checkuser_core::error::AppError;
use checkuser_server::app;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    app::init_logging(&config.logging);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("CHECKUSER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    AppConfig::load(&config_path)
        .map_err(|e| AppError::configuration(format!("Config load error ({config_path}): {e}")))
}

/// Run the server with graceful shutdown wired to process signals
async fn run(config: AppConfig) -> Result<(), AppError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        app::shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    app::run_server(&config, shutdown_rx).await?;

    tracing::info!("CheckUser server shut down gracefully");
    Ok(())
}
