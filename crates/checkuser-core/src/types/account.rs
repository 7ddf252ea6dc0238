//! System account records and username validation.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// An entry of the host account database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemAccount {
    /// Login name.
    pub username: String,
    /// Numeric user id.
    pub uid: u32,
}

impl SystemAccount {
    /// Parse one colon-delimited account database line.
    ///
    /// Returns `None` for comments, blank lines, and lines whose third
    /// field is not a number.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut fields = line.split(':');
        let username = fields.next()?.trim();
        let _password = fields.next()?;
        let uid = fields.next()?.trim().parse().ok()?;

        if username.is_empty() {
            return None;
        }

        Some(Self {
            username: username.to_string(),
            uid,
        })
    }

    /// Whether this account is an end-user account for the given threshold.
    pub fn is_in_scope(&self, min_uid: u32) -> bool {
        self.uid >= min_uid
    }
}

/// Parse an account database and keep only accounts with `uid >= min_uid`.
pub fn parse_accounts(data: &str, min_uid: u32) -> Vec<SystemAccount> {
    data.lines()
        .filter_map(SystemAccount::parse_line)
        .filter(|account| account.is_in_scope(min_uid))
        .collect()
}

/// Reject names that could break out of a management-protocol line.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::validation("User name is required"));
    }

    if username
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(AppError::validation(format!(
            "Invalid user name: {username:?}"
        )));
    }

    Ok(())
}
