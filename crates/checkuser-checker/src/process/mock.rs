//! In-memory [`ProcessQuery`] for development and testing.
//!
//! Simulates a process table, an account database, and service states
//! without touching the host.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing;

use checkuser_core::types::SystemAccount;

use super::ProcessQuery;

/// Simulated processes and account data of one user.
#[derive(Debug, Clone, Default)]
struct MockUser {
    /// SSH session processes.
    ssh_pids: Vec<u32>,
    /// Other processes (shells, daemons) owned by the user.
    other_pids: Vec<u32>,
    /// Value printed by the expiration inquiry.
    expiration: Option<String>,
    /// Elapsed time of the oldest SSH session.
    time_online: Option<String>,
}

/// Mock process query that keeps all state in memory.
#[derive(Debug)]
pub struct MockProcessQuery {
    /// Users by name
    users: Mutex<HashMap<String, MockUser>>,
    /// Account database entries, unfiltered
    accounts: Mutex<Vec<SystemAccount>>,
    /// Services reporting an active state
    active_services: Mutex<HashSet<String>>,
    /// PIDs passed to `kill_processes`
    killed: Mutex<Vec<u32>>,
    /// Lowest in-scope uid
    min_uid: u32,
    /// Number of inquiries served
    inquiries: AtomicUsize,
}

impl MockProcessQuery {
    /// Create an empty mock with the default uid threshold.
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            accounts: Mutex::new(Vec::new()),
            active_services: Mutex::new(HashSet::new()),
            killed: Mutex::new(Vec::new()),
            min_uid: 1000,
            inquiries: AtomicUsize::new(0),
        }
    }

    /// Add an SSH session process for a user.
    pub fn add_ssh_session(&self, username: &str, pid: u32) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users
            .entry(username.to_string())
            .or_default()
            .ssh_pids
            .push(pid);
    }

    /// Add a non-SSH process for a user.
    pub fn add_process(&self, username: &str, pid: u32) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users
            .entry(username.to_string())
            .or_default()
            .other_pids
            .push(pid);
    }

    /// Set the expiration value printed for a user.
    pub fn set_expiration(&self, username: &str, date: &str) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users.entry(username.to_string()).or_default().expiration = Some(date.to_string());
    }

    /// Set the online duration of a user.
    pub fn set_time_online(&self, username: &str, elapsed: &str) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users.entry(username.to_string()).or_default().time_online = Some(elapsed.to_string());
    }

    /// Add an account database entry.
    pub fn add_account(&self, username: &str, uid: u32) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts.push(SystemAccount {
            username: username.to_string(),
            uid,
        });
    }

    /// Mark a service active or inactive.
    pub fn set_service_active(&self, service: &str, active: bool) {
        let mut services = self
            .active_services
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if active {
            services.insert(service.to_string());
        } else {
            services.remove(service);
        }
    }

    /// PIDs killed so far, in order.
    pub fn killed_pids(&self) -> Vec<u32> {
        self.killed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of inquiries served so far.
    pub fn inquiry_count(&self) -> usize {
        self.inquiries.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.inquiries.fetch_add(1, Ordering::SeqCst);
    }

    fn user(&self, username: &str) -> Option<MockUser> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users.get(username).cloned()
    }
}

impl Default for MockProcessQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessQuery for MockProcessQuery {
    async fn count_ssh_sessions(&self, username: &str) -> u32 {
        self.record();
        self.user(username)
            .map(|u| u.ssh_pids.len() as u32)
            .unwrap_or(0)
    }

    async fn session_pids(&self, username: &str) -> Vec<u32> {
        self.record();
        self.user(username)
            .map(|u| u.ssh_pids.into_iter().chain(u.other_pids).collect())
            .unwrap_or_default()
    }

    async fn kill_processes(&self, pids: Vec<u32>) {
        self.record();
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        for user in users.values_mut() {
            user.ssh_pids.retain(|pid| !pids.contains(pid));
            user.other_pids.retain(|pid| !pids.contains(pid));
            if user.ssh_pids.is_empty() {
                user.time_online = None;
            }
        }
        drop(users);

        tracing::info!("[MockProcess] Killed {} processes", pids.len());
        self.killed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(pids);
    }

    async fn expiration_date(&self, username: &str) -> Option<String> {
        self.record();
        self.user(username).and_then(|u| u.expiration)
    }

    async fn time_online(&self, username: &str) -> Option<String> {
        self.record();
        self.user(username).and_then(|u| u.time_online)
    }

    async fn system_accounts(&self) -> Vec<SystemAccount> {
        self.record();
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts
            .iter()
            .filter(|account| account.is_in_scope(self.min_uid))
            .cloned()
            .collect()
    }

    async fn service_active(&self, service: &str) -> bool {
        self.record();
        let services = self
            .active_services
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        services.contains(service)
    }
}
