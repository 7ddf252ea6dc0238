//! [`ProcessQuery`] backed by `ps`, `chage`, `kill`, `service`, and the
//! account database file.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing;

use checkuser_core::config::CheckerConfig;
use checkuser_core::types::SystemAccount;
use checkuser_core::types::account::parse_accounts;

use super::ProcessQuery;
use super::parse;
use crate::exec::{self, CommandOutput, ExecError};

/// Inquiries against the local host.
#[derive(Debug, Clone)]
pub struct SystemProcessQuery {
    /// Account database path.
    passwd_file: PathBuf,
    /// Lowest in-scope uid.
    min_uid: u32,
    /// Timeout for each spawned inquiry.
    timeout: Duration,
}

impl SystemProcessQuery {
    /// Create a new system query.
    pub fn new(passwd_file: PathBuf, min_uid: u32, timeout: Duration) -> Self {
        Self {
            passwd_file,
            min_uid,
            timeout,
        }
    }

    /// Build from checker configuration.
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self::new(
            config.passwd_file.clone(),
            config.min_uid,
            Duration::from_secs(config.command_timeout_seconds),
        )
    }

    async fn inquire(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ExecError> {
        let result = exec::run_checked(program, args, self.timeout).await;
        if let Err(ref e) = result {
            tracing::debug!("Inquiry '{}' {:?} failed: {}", program, args, e);
        }
        result
    }
}

#[async_trait]
impl ProcessQuery for SystemProcessQuery {
    async fn count_ssh_sessions(&self, username: &str) -> u32 {
        match self.inquire("ps", &["-u", username]).await {
            Ok(output) => parse::count_ssh_sessions(&output.stdout),
            Err(_) => 0,
        }
    }

    async fn session_pids(&self, username: &str) -> Vec<u32> {
        match self.inquire("ps", &["-u", username]).await {
            Ok(output) => parse::parse_pids(&output.stdout),
            Err(_) => Vec::new(),
        }
    }

    async fn kill_processes(&self, pids: Vec<u32>) {
        let kills = pids.iter().map(|pid| {
            let pid = pid.to_string();
            async move {
                if let Err(e) = exec::run("kill", &["-9", &pid], self.timeout).await {
                    tracing::debug!("kill -9 {} failed: {}", pid, e);
                }
            }
        });
        futures::future::join_all(kills).await;
        tracing::debug!("Sent SIGKILL to {} processes", pids.len());
    }

    async fn expiration_date(&self, username: &str) -> Option<String> {
        let output = self.inquire("chage", &["-l", username]).await.ok()?;
        parse::parse_expiration(&output.stdout)
    }

    async fn time_online(&self, username: &str) -> Option<String> {
        let output = self
            .inquire("ps", &["-u", username, "-o", "etime=,comm="])
            .await
            .ok()?;
        parse::oldest_session_elapsed(&output.stdout)
    }

    async fn system_accounts(&self) -> Vec<SystemAccount> {
        match tokio::fs::read_to_string(&self.passwd_file).await {
            Ok(data) => parse_accounts(&data, self.min_uid),
            Err(e) => {
                tracing::warn!(
                    "Failed to read account database '{}': {}",
                    self.passwd_file.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    async fn service_active(&self, service: &str) -> bool {
        match self.inquire("service", &[service, "status"]).await {
            Ok(output) => output.stdout.contains("Active: active"),
            Err(_) => false,
        }
    }
}
