//! Request server and worker pool configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// TCP request server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of concurrent request workers.
    #[serde(default = "default_workers")]
    #[validate(range(min = 1, max = 1024))]
    pub workers: usize,
    /// Capacity of the pending-connection queue shared by the workers.
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
    /// How long a worker waits for the request bytes, in milliseconds.
    #[serde(default = "default_read_timeout")]
    #[validate(range(min = 1))]
    pub read_timeout_ms: u64,
    /// Maximum number of request bytes read from a connection.
    #[serde(default = "default_max_request_bytes")]
    #[validate(range(min = 16))]
    pub max_request_bytes: usize,
    /// Open-file-descriptor ceiling requested at startup.
    #[serde(default = "default_nofile_limit")]
    pub nofile_limit: u64,
    /// Time given to in-flight requests before workers are aborted.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl ServerConfig {
    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            read_timeout_ms: default_read_timeout(),
            max_request_bytes: default_max_request_bytes(),
            nofile_limit: default_nofile_limit(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_workers() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_read_timeout() -> u64 {
    5000
}

fn default_max_request_bytes() -> usize {
    8192
}

fn default_nofile_limit() -> u64 {
    65536
}

fn default_shutdown_grace() -> u64 {
    10
}
