//! Client for the OpenVPN management interface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing;

use checkuser_core::config::OpenVpnConfig;

use super::ManagementError;
use super::scanner::{StatusDump, StatusScanner};
use crate::process::ProcessQuery;

/// Read size per chunk of a status dump.
const CHUNK_SIZE: usize = 1024;

/// Talks to the OpenVPN daemon over its local management port.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    /// `host:port` of the management interface
    addr: String,
    /// Server configuration file checked by the availability gate
    config_file: PathBuf,
    /// Service name checked by the availability gate
    service: String,
    /// Connect timeout
    connect_timeout: Duration,
    /// Timeout for the whole status dump
    read_timeout: Duration,
    /// Used for the service state inquiry
    process: Arc<dyn ProcessQuery>,
}

impl ManagementClient {
    /// Create a client from configuration.
    pub fn new(config: &OpenVpnConfig, process: Arc<dyn ProcessQuery>) -> Self {
        Self {
            addr: config.addr(),
            config_file: config.config_file.clone(),
            service: config.service.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            process,
        }
    }

    /// Management interface address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Whether OpenVPN is installed and its service reports active.
    ///
    /// Checked before aggregate work so a stopped daemon costs no
    /// connection timeouts.
    pub async fn is_available(&self) -> bool {
        let installed = tokio::fs::try_exists(&self.config_file)
            .await
            .unwrap_or(false);
        if !installed {
            tracing::debug!(
                "OpenVPN config '{}' not found, skipping VPN sessions",
                self.config_file.display()
            );
            return false;
        }

        let active = self.process.service_active(&self.service).await;
        if !active {
            tracing::debug!("Service '{}' is not active", self.service);
        }
        active
    }

    /// Request a `status` dump.
    ///
    /// Reads until the `END` terminator arrives or the daemon closes the
    /// connection, whichever comes first.
    pub async fn status(&self) -> Result<StatusDump, ManagementError> {
        let mut stream = self.connect().await?;
        stream.write_all(b"status\n").await?;

        let mut scanner = StatusScanner::new();
        let read_all = async {
            let mut chunk = [0u8; CHUNK_SIZE];
            loop {
                let n = stream.read(&mut chunk).await?;
                if n == 0 || scanner.push(&chunk[..n]) {
                    break;
                }
            }
            Ok::<_, std::io::Error>(())
        };

        match tokio::time::timeout(self.read_timeout, read_all).await {
            Ok(result) => result?,
            Err(_) => return Err(ManagementError::Timeout(self.read_timeout.as_millis() as u64)),
        }

        let _ = stream.shutdown().await;
        if !scanner.is_complete() {
            tracing::debug!("Status from {} closed before the END marker", self.addr);
        }
        tracing::trace!(
            "Received {} bytes of status from {}",
            scanner.received_bytes(),
            self.addr
        );
        Ok(scanner.finish())
    }

    /// VPN sessions of `username`; zero when the daemon cannot be reached.
    pub async fn count_sessions(&self, username: &str) -> u32 {
        match self.status().await {
            Ok(dump) => dump.session_count(username),
            Err(e) => {
                tracing::debug!("OpenVPN status unavailable: {}", e);
                0
            }
        }
    }

    /// Send `kill <username>` without waiting for a reply.
    pub async fn kill(&self, username: &str) -> Result<(), ManagementError> {
        let mut stream = self.connect().await?;
        stream
            .write_all(format!("kill {username}\n").as_bytes())
            .await?;
        stream.flush().await?;
        let _ = stream.shutdown().await;
        tracing::debug!("Sent kill for '{}' to {}", username, self.addr);
        Ok(())
    }

    async fn connect(&self) -> Result<TcpStream, ManagementError> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(ManagementError::Connect {
                addr: self.addr.clone(),
                source,
            }),
            Err(_) => Err(ManagementError::Timeout(
                self.connect_timeout.as_millis() as u64,
            )),
        }
    }
}
