//! Per-user connection report.

use serde::{Deserialize, Serialize};

/// Sentinel for "unlimited or unknown" limits and "never or unparseable"
/// expiration days.
pub const UNKNOWN: i64 = -1;

/// Aggregated view of one user's sessions, limit, and account expiry.
///
/// Produced per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReport {
    /// Account name the report was built for.
    pub username: String,
    /// Active SSH plus VPN sessions.
    pub connection_count: u32,
    /// Configured connection limit, `-1` when unlimited or unknown.
    pub connection_limit: i64,
    /// Expiration date as printed by the account inquiry (`"never"` kept verbatim).
    pub expiration_date: Option<String>,
    /// Whole days until expiration, `-1` when it never expires or the date is unparseable.
    pub expiration_days: i64,
    /// Elapsed time of the oldest SSH session, as printed by the process table.
    pub time_online: Option<String>,
}

impl UserReport {
    /// A report with every field at its "nothing known" sentinel.
    pub fn empty(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            connection_count: 0,
            connection_limit: UNKNOWN,
            expiration_date: None,
            expiration_days: UNKNOWN,
            time_online: None,
        }
    }
}
