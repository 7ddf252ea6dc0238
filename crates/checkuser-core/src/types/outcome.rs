//! Result payloads of the kill and count-all operations.

use serde::{Deserialize, Serialize};

/// Outcome of terminating a user's sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillOutcome {
    /// Whether every termination path completed.
    pub success: bool,
    /// Captured failure message, `null` on success.
    pub error: Option<String>,
}

impl KillOutcome {
    /// Successful outcome.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Failed outcome carrying a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Total sessions across every in-scope account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTotal {
    /// Summed SSH and VPN sessions.
    pub count: u64,
    /// Whether the scan completed.
    pub success: bool,
    /// Failure message, omitted on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTotal {
    /// Completed scan.
    pub fn ok(count: u64) -> Self {
        Self {
            count,
            success: true,
            error: None,
        }
    }

    /// Failed scan.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            count: 0,
            success: false,
            error: Some(message.into()),
        }
    }
}
