//! Wiring from configuration to a running request server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use checkuser_checker::process::SystemProcessQuery;
use checkuser_checker::{ConnectionChecker, ProcessQuery};
use checkuser_core::AppResult;
use checkuser_core::config::{AppConfig, LoggingConfig};

use crate::command::CommandRegistry;
use crate::limits;
use crate::server::RequestServer;

/// Install the global subscriber from the logging section. `RUST_LOG`
/// overrides the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Build the checker backed by the real operating system.
pub fn build_checker(config: &AppConfig) -> Arc<ConnectionChecker> {
    let process: Arc<dyn ProcessQuery> = Arc::new(SystemProcessQuery::from_config(&config.checker));
    Arc::new(ConnectionChecker::from_config(&config.checker, process))
}

/// Build the command registry served over TCP.
pub fn build_registry(config: &AppConfig) -> Arc<CommandRegistry> {
    Arc::new(CommandRegistry::new(
        build_checker(config),
        config.checker.exclude.clone(),
    ))
}

/// Run the request server until `shutdown` flips to `true`.
pub async fn run_server(config: &AppConfig, shutdown: watch::Receiver<bool>) -> AppResult<()> {
    tracing::info!("Starting CheckUser v{}", env!("CARGO_PKG_VERSION"));

    match limits::raise_nofile_limit(config.server.nofile_limit) {
        Ok(limit) => tracing::debug!("Open file limit is {}", limit),
        Err(e) => tracing::warn!("Could not raise open file limit: {}", e),
    }

    if !config.checker.exclude.is_empty() {
        tracing::info!("Excluding report fields: {:?}", config.checker.exclude);
    }

    let registry = build_registry(config);
    tracing::info!("Serving commands: {}", registry.command_names().join(", "));

    let server = RequestServer::bind(&config.server, registry).await?;
    server.run(shutdown).await
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
