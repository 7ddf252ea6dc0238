//! Per-user connection limits.
//!
//! Lookup order:
//! 1. The flat limit file (`username limit` per line, first match wins)
//! 2. The optional limiter tool (`<tool> -u <username> -s`)
//! 3. `-1` (unlimited or unknown)

use std::path::PathBuf;
use std::time::Duration;

use tracing;

use checkuser_core::config::CheckerConfig;
use checkuser_core::types::UNKNOWN;

use crate::exec;

/// Reply of the limiter tool for unknown users.
const TOOL_NOT_FOUND: &str = "User not found";

/// Label preceding the limit in the limiter tool's output.
const TOOL_LIMIT_LABEL: &str = "Limit connections:";

/// Result of a limit lookup before it is collapsed to the wire sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitLookup {
    /// A limit is configured for the user.
    Configured(i64),
    /// No source knows the user.
    NotConfigured,
    /// A source knew the user but its answer could not be used.
    Failed(String),
}

impl LimitLookup {
    /// Wire value: the configured limit or `-1`.
    pub fn value(&self) -> i64 {
        match self {
            Self::Configured(limit) => *limit,
            Self::NotConfigured | Self::Failed(_) => UNKNOWN,
        }
    }
}

/// Two-tier connection limit lookup.
#[derive(Debug, Clone)]
pub struct LimitStore {
    /// Flat limit file
    path: PathBuf,
    /// Secondary limiter tool, if any
    tool: Option<String>,
    /// Timeout for the limiter tool
    timeout: Duration,
}

impl LimitStore {
    /// Create a new limit store.
    pub fn new(path: PathBuf, tool: Option<String>, timeout: Duration) -> Self {
        Self {
            path,
            tool: tool.filter(|t| !t.trim().is_empty()),
            timeout,
        }
    }

    /// Build from checker configuration.
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self::new(
            config.limit_file.clone(),
            Some(config.limiter_tool.clone()),
            Duration::from_secs(config.command_timeout_seconds),
        )
    }

    /// Connection limit of `username`, `-1` when unlimited or unknown.
    pub async fn limit(&self, username: &str) -> i64 {
        let lookup = self.lookup(username).await;
        if let LimitLookup::Failed(ref reason) = lookup {
            tracing::warn!("Limit lookup for '{}' failed: {}", username, reason);
        }
        lookup.value()
    }

    /// Full lookup, distinguishing "not configured" from "failed".
    pub async fn lookup(&self, username: &str) -> LimitLookup {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => {
                if let Some(lookup) = find_in_file(&data, username) {
                    return lookup;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::debug!("Failed to read limit file '{}': {}", self.path.display(), e);
            }
        }

        match self.tool {
            Some(ref tool) => self.ask_tool(tool, username).await,
            None => LimitLookup::NotConfigured,
        }
    }

    async fn ask_tool(&self, tool: &str, username: &str) -> LimitLookup {
        if !exec::command_available(tool).await {
            return LimitLookup::NotConfigured;
        }

        match exec::run_checked(tool, &["-u", username, "-s"], self.timeout).await {
            Ok(output) => parse_tool_output(&output.stdout),
            Err(e) => LimitLookup::Failed(e.to_string()),
        }
    }
}

/// First `username limit` line whose first field equals `username`.
fn find_in_file(data: &str, username: &str) -> Option<LimitLookup> {
    data.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [name, limit] if *name == username => Some(match limit.parse::<i64>() {
                Ok(limit) => LimitLookup::Configured(limit),
                Err(_) => LimitLookup::Failed(format!("invalid limit '{limit}'")),
            }),
            _ => None,
        }
    })
}

/// Interpret the limiter tool's reply.
fn parse_tool_output(stdout: &str) -> LimitLookup {
    let text = stdout.trim();
    if text == TOOL_NOT_FOUND {
        return LimitLookup::NotConfigured;
    }

    let Some((_, rest)) = text.split_once(TOOL_LIMIT_LABEL) else {
        return LimitLookup::Failed(format!("unexpected limiter output '{text}'"));
    };

    match rest.split_whitespace().next().map(str::parse::<i64>) {
        Some(Ok(limit)) => LimitLookup::Configured(limit),
        _ => LimitLookup::Failed(format!("unexpected limiter output '{text}'")),
    }
}
