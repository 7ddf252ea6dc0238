//! Unified per-user view over SSH and OpenVPN sessions.

use std::sync::Arc;

use chrono::Local;
use futures::stream::{self, StreamExt};
use tracing;

use checkuser_core::AppResult;
use checkuser_core::config::CheckerConfig;
use checkuser_core::error::AppError;
use checkuser_core::types::account::validate_username;
use checkuser_core::types::{KillOutcome, UserReport};

use crate::expiration::expiration_days;
use crate::limit::LimitStore;
use crate::openvpn::ManagementClient;
use crate::process::ProcessQuery;

/// Combines process-table, management-channel, and limit inquiries.
#[derive(Debug, Clone)]
pub struct ConnectionChecker {
    /// OS inquiries
    process: Arc<dyn ProcessQuery>,
    /// OpenVPN management channel
    management: Arc<ManagementClient>,
    /// Connection limits
    limits: Arc<LimitStore>,
    /// Per-account inquiries in flight during `count_all`
    scan_concurrency: usize,
}

impl ConnectionChecker {
    /// Create a checker from its collaborators.
    pub fn new(
        process: Arc<dyn ProcessQuery>,
        management: Arc<ManagementClient>,
        limits: Arc<LimitStore>,
        scan_concurrency: usize,
    ) -> Self {
        Self {
            process,
            management,
            limits,
            scan_concurrency: scan_concurrency.max(1),
        }
    }

    /// Build a checker from configuration around the given process query.
    pub fn from_config(config: &CheckerConfig, process: Arc<dyn ProcessQuery>) -> Self {
        let management = Arc::new(ManagementClient::new(
            &config.openvpn,
            Arc::clone(&process),
        ));
        let limits = Arc::new(LimitStore::from_config(config));
        Self::new(process, management, limits, config.scan_concurrency)
    }

    /// VPN sessions of `username`, zero when the daemon is down.
    pub async fn vpn_sessions(&self, username: &str) -> u32 {
        if !self.management.is_available().await {
            return 0;
        }
        self.management.count_sessions(username).await
    }

    /// SSH plus VPN sessions of `username`.
    pub async fn connection_count(&self, username: &str) -> u32 {
        let (vpn, ssh) = tokio::join!(
            self.vpn_sessions(username),
            self.process.count_ssh_sessions(username)
        );
        vpn + ssh
    }

    /// Build the full report for `username`.
    ///
    /// Sub-queries are sentinel-safe, so the only error is an invalid name.
    pub async fn report(&self, username: &str) -> AppResult<UserReport> {
        validate_username(username)?;

        let (connection_count, connection_limit, expiration_date, time_online) = tokio::join!(
            self.connection_count(username),
            self.limits.limit(username),
            self.process.expiration_date(username),
            self.process.time_online(username),
        );

        let expiration_days =
            expiration_days(expiration_date.as_deref(), Local::now().naive_local());

        tracing::debug!(
            "Report for '{}': connections={}, limit={}, expiration_days={}",
            username,
            connection_count,
            connection_limit,
            expiration_days
        );

        Ok(UserReport {
            username: username.to_string(),
            connection_count,
            connection_limit,
            expiration_date,
            expiration_days,
            time_online,
        })
    }

    /// Terminate every SSH process and VPN session of `username`.
    ///
    /// Both paths always run. Each is best effort; only a path that
    /// panics marks the outcome failed.
    pub async fn kill(&self, username: &str) -> KillOutcome {
        if let Err(e) = validate_username(username) {
            return KillOutcome::failed(e.message);
        }

        let process = Arc::clone(&self.process);
        let ssh_user = username.to_string();
        let ssh = tokio::spawn(async move {
            let pids = process.session_pids(&ssh_user).await;
            let count = pids.len();
            process.kill_processes(pids).await;
            count
        });

        let management = Arc::clone(&self.management);
        let vpn_user = username.to_string();
        let vpn = tokio::spawn(async move {
            if let Err(e) = management.kill(&vpn_user).await {
                tracing::debug!("OpenVPN kill for '{}' skipped: {}", vpn_user, e);
            }
        });

        let (ssh, vpn) = tokio::join!(ssh, vpn);

        let mut errors = Vec::new();
        match ssh {
            Ok(count) => tracing::info!("Killed {} processes of '{}'", count, username),
            Err(e) => errors.push(format!("SSH kill failed: {e}")),
        }
        if let Err(e) = vpn {
            errors.push(format!("OpenVPN kill failed: {e}"));
        }

        if errors.is_empty() {
            KillOutcome::ok()
        } else {
            tracing::error!("Kill for '{}' incomplete: {}", username, errors.join("; "));
            KillOutcome::failed(errors.join("; "))
        }
    }

    /// Sessions summed over every end-user account.
    ///
    /// One status dump is fetched and every account is counted against it.
    pub async fn count_all(&self) -> AppResult<u64> {
        let accounts = self.process.system_accounts().await;

        let dump = if self.management.is_available().await {
            match self.management.status().await {
                Ok(dump) => Some(dump),
                Err(e) => {
                    tracing::warn!("OpenVPN status unavailable during scan: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let dump = dump.unwrap_or_default();

        let total = stream::iter(accounts)
            .map(|account| {
                let process = Arc::clone(&self.process);
                let vpn = u64::from(dump.session_count(&account.username));
                async move {
                    let ssh = process.count_ssh_sessions(&account.username).await;
                    vpn + u64::from(ssh)
                }
            })
            .buffer_unordered(self.scan_concurrency)
            .fold(0u64, |acc, count| async move { acc + count })
            .await;

        tracing::info!("Counted {} connections across all accounts", total);
        Ok(total)
    }

    /// Report with the named fields removed, as a JSON object.
    pub async fn report_json(
        &self,
        username: &str,
        exclude: &[String],
    ) -> AppResult<serde_json::Value> {
        let report = self.report(username).await?;
        let mut value = serde_json::to_value(report)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| AppError::internal("Report did not serialize to an object"))?;
        for field in exclude {
            if object.remove(field).is_some() {
                tracing::debug!("Excluded field '{}' from report", field);
            }
        }
        Ok(value)
    }
}
