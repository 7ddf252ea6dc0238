//! Start the request server in the foreground.

use clap::Args;
use tokio::sync::watch;

use checkuser_core::error::AppError;
use checkuser_server::app;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the number of workers
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, config_path: &str) -> Result<(), AppError> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(workers) = args.workers {
        config.server.workers = workers;
    }
    config.check()?;
    app::init_logging(&config.logging);

    println!("Starting CheckUser server...");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!("  Workers: {}", config.server.workers);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        app::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    app::run_server(&config, shutdown_rx).await
}
