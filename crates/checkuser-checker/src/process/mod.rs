//! Process-table and account inquiries.
//!
//! [`ProcessQuery`] is the seam between the checker and the host OS.
//! Implementations never fail: an inquiry that errors yields zero, an
//! empty list, `None`, or `false`, so one broken account cannot abort a
//! scan over all of them.

pub mod mock;
pub mod parse;
pub mod system;

use async_trait::async_trait;

use checkuser_core::types::SystemAccount;

pub use mock::MockProcessQuery;
pub use system::SystemProcessQuery;

/// OS inquiries used by the connection checker.
#[async_trait]
pub trait ProcessQuery: Send + Sync + std::fmt::Debug {
    /// Number of SSH session processes owned by the user.
    async fn count_ssh_sessions(&self, username: &str) -> u32;

    /// PIDs of every process owned by the user.
    async fn session_pids(&self, username: &str) -> Vec<u32>;

    /// Force-terminate the given processes. Best effort; the list is consumed.
    async fn kill_processes(&self, pids: Vec<u32>);

    /// Account expiration date as printed by the system, `"never"` verbatim.
    async fn expiration_date(&self, username: &str) -> Option<String>;

    /// Elapsed time of the user's oldest SSH session.
    async fn time_online(&self, username: &str) -> Option<String>;

    /// End-user accounts (uid at or above the configured minimum).
    async fn system_accounts(&self) -> Vec<SystemAccount>;

    /// Whether the named service reports an active state.
    async fn service_active(&self, service: &str) -> bool;
}
