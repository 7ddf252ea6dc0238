//! OpenVPN management interface.
//!
//! The daemon speaks a line-oriented protocol on a local TCP port. Only
//! two commands are used: `status` (a dump ending in `\r\nEND\r\n`) and
//! `kill <common name>`.

pub mod client;
pub mod scanner;

use thiserror::Error;

pub use client::ManagementClient;
pub use scanner::{StatusDump, StatusScanner, session_count};

/// Errors talking to the management interface.
#[derive(Debug, Error)]
pub enum ManagementError {
    /// The daemon refused or did not accept the connection.
    #[error("Failed to connect to management interface at {addr}: {source}")]
    Connect {
        /// Target address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Connecting or reading exceeded its timeout.
    #[error("Management interface timed out after {0} ms")]
    Timeout(u64),

    /// Reading or writing failed mid-conversation.
    #[error("Management interface I/O error: {0}")]
    Io(#[from] std::io::Error),
}
