//! Per-connection request handling.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{self, Instrument};
use uuid::Uuid;

use checkuser_core::AppResult;
use checkuser_core::config::ServerConfig;
use checkuser_core::error::AppError;

use crate::command::CommandRegistry;
use crate::pool::PendingConnection;
use crate::request::Request;
use crate::response::Response;

/// Reads one request, dispatches it, and writes the response.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    /// Command registry
    registry: Arc<CommandRegistry>,
    /// Time allowed for the request bytes to arrive
    read_timeout: Duration,
    /// Upper bound on bytes read from the connection
    max_request_bytes: usize,
}

impl ConnectionHandler {
    /// Create a new handler.
    pub fn new(registry: Arc<CommandRegistry>, read_timeout: Duration, max_request_bytes: usize) -> Self {
        Self {
            registry,
            read_timeout,
            max_request_bytes,
        }
    }

    /// Build from server configuration.
    pub fn from_config(registry: Arc<CommandRegistry>, config: &ServerConfig) -> Self {
        Self::new(
            registry,
            Duration::from_millis(config.read_timeout_ms),
            config.max_request_bytes,
        )
    }

    /// Registry commands are dispatched through.
    pub fn registry(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.registry)
    }

    /// Serve one connection to completion; the stream is closed on return.
    pub async fn handle(&self, connection: PendingConnection) {
        let PendingConnection {
            mut stream,
            peer,
            accepted_at,
        } = connection;
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("request", id = %request_id, peer = %peer);

        async move {
            tracing::debug!("Dequeued after {:?}", accepted_at.elapsed());

            let response = self.respond(&mut stream).await;
            if let Err(e) = stream.write_all(&response.to_bytes()).await {
                tracing::debug!("Failed to write response: {}", e);
            }
            let _ = stream.shutdown().await;

            tracing::info!(
                "Completed with {} in {:?}",
                response.status.as_u16(),
                accepted_at.elapsed()
            );
        }
        .instrument(span)
        .await
    }

    /// Produce the response for whatever the client sent.
    async fn respond(&self, stream: &mut TcpStream) -> Response {
        let request = match self.receive(stream).await {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Rejected request: {}", e);
                return Response::forbidden();
            }
        };

        tracing::info!("Request path '{}'", request.path);

        match self
            .registry
            .dispatch(&request.command, request.argument.as_deref())
            .await
        {
            Ok(payload) => Response::ok(payload),
            Err(e) => {
                tracing::warn!("Command '{}' failed: {}", request.command, e);
                Response::error(e.to_string())
            }
        }
    }

    /// Read and parse the request.
    ///
    /// Bytes received before the read timeout are still parsed; only a
    /// client that sent nothing at all times out.
    async fn receive(&self, stream: &mut TcpStream) -> AppResult<Request> {
        let mut data = Vec::with_capacity(self.max_request_bytes.min(1024));
        let read = tokio::time::timeout(self.read_timeout, self.read_request(stream, &mut data)).await;
        match read {
            Ok(result) => result?,
            Err(_) if data.is_empty() => {
                return Err(AppError::timeout(format!(
                    "No request within {:?}",
                    self.read_timeout
                )));
            }
            Err(_) => tracing::debug!("Parsing {} bytes received before timeout", data.len()),
        }

        Request::parse(&data)
    }

    /// Read into `data` until the first line ends, the peer stops
    /// sending, or the size bound is hit.
    async fn read_request(&self, stream: &mut TcpStream, data: &mut Vec<u8>) -> std::io::Result<()> {
        let mut chunk = [0u8; 1024];

        while data.len() < self.max_request_bytes {
            let want = chunk.len().min(self.max_request_bytes - data.len());
            let n = stream.read(&mut chunk[..want]).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
            if data.contains(&b'\n') {
                break;
            }
        }

        Ok(())
    }
}
