//! Accept loop feeding the worker pool.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing;

use checkuser_core::AppResult;
use checkuser_core::config::ServerConfig;
use checkuser_core::error::{AppError, ErrorKind};

use crate::command::CommandRegistry;
use crate::handler::ConnectionHandler;
use crate::pool::{PendingConnection, WorkerPool};

/// Pause after a failed accept, e.g. when descriptors run out.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP request server.
#[derive(Debug)]
pub struct RequestServer {
    /// Bound listener
    listener: TcpListener,
    /// Workers draining accepted connections
    pool: WorkerPool,
    /// Time given to in-flight requests on shutdown
    shutdown_grace: Duration,
}

impl RequestServer {
    /// Bind to the configured address and start the workers.
    pub async fn bind(config: &ServerConfig, registry: Arc<CommandRegistry>) -> AppResult<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            AppError::with_source(ErrorKind::Io, format!("Failed to bind {addr}"), e)
        })?;
        Ok(Self::from_listener(listener, config, registry))
    }

    /// Serve on an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        config: &ServerConfig,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        let handler = Arc::new(ConnectionHandler::from_config(registry, config));
        let pool = WorkerPool::start(config.workers, config.queue_capacity, handler);
        Self {
            listener,
            pool,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_seconds),
        }
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` flips to `true`.
    ///
    /// A full queue blocks the loop, so new clients wait in the kernel
    /// backlog instead of piling up in memory.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let addr = self.local_addr()?;
        tracing::info!("CheckUser listening on {}", addr);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Request server received shutdown signal");
                        break;
                    }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tracing::trace!("Accepted connection from {}", peer);
                            let connection = PendingConnection {
                                stream,
                                peer,
                                accepted_at: Instant::now(),
                            };
                            if self.submit_or_stop(connection, &mut shutdown).await? {
                                tracing::info!("Request server received shutdown signal");
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Accept failed: {}", e);
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
            }
        }

        let Self {
            listener,
            pool,
            shutdown_grace,
        } = self;
        drop(listener);
        tracing::info!("Draining {} queued connections", pool.queued());
        pool.shutdown(shutdown_grace).await;

        tracing::info!("Request server stopped");
        Ok(())
    }

    /// Queue `connection` unless shutdown arrives while the queue is full.
    /// Returns `true` when the server should stop.
    async fn submit_or_stop(
        &self,
        connection: PendingConnection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> AppResult<bool> {
        let submit = self.pool.submit(connection);
        tokio::pin!(submit);

        loop {
            tokio::select! {
                submitted = &mut submit => {
                    submitted?;
                    return Ok(false);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Dropping connection blocked on a full queue");
                        return Ok(true);
                    }
                }
            }
        }
    }
}
