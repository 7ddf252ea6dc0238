//! Connection checker configuration: local files, external tools, and the
//! OpenVPN management channel.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for the per-user connection checker.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckerConfig {
    /// Flat `username limit` file consulted first for connection limits.
    #[serde(default = "default_limit_file")]
    pub limit_file: PathBuf,
    /// Secondary limiter tool asked when the file has no entry.
    ///
    /// An empty string disables the secondary lookup.
    #[serde(default = "default_limiter_tool")]
    pub limiter_tool: String,
    /// System account database.
    #[serde(default = "default_passwd_file")]
    pub passwd_file: PathBuf,
    /// Lowest uid treated as an end-user account.
    #[serde(default = "default_min_uid")]
    pub min_uid: u32,
    /// Upper bound for any single external inquiry.
    #[serde(default = "default_command_timeout")]
    #[validate(range(min = 1))]
    pub command_timeout_seconds: u64,
    /// Report fields stripped from `check` responses.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Maximum per-account inquiries in flight while counting all accounts.
    #[serde(default = "default_scan_concurrency")]
    #[validate(range(min = 1))]
    pub scan_concurrency: usize,
    /// OpenVPN management channel.
    #[serde(default)]
    #[validate(nested)]
    pub openvpn: OpenVpnConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            limit_file: default_limit_file(),
            limiter_tool: default_limiter_tool(),
            passwd_file: default_passwd_file(),
            min_uid: default_min_uid(),
            command_timeout_seconds: default_command_timeout(),
            exclude: Vec::new(),
            scan_concurrency: default_scan_concurrency(),
            openvpn: OpenVpnConfig::default(),
        }
    }
}

/// OpenVPN management interface settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenVpnConfig {
    /// Management interface host.
    #[serde(default = "default_vpn_host")]
    pub host: String,
    /// Management interface port.
    #[serde(default = "default_vpn_port")]
    pub port: u16,
    /// Server configuration file; its absence means OpenVPN is not installed.
    #[serde(default = "default_vpn_config_file")]
    pub config_file: PathBuf,
    /// Service name passed to the service status inquiry.
    #[serde(default = "default_vpn_service")]
    pub service: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_vpn_connect_timeout")]
    #[validate(range(min = 1))]
    pub connect_timeout_ms: u64,
    /// Timeout for the whole status dump, in milliseconds.
    #[serde(default = "default_vpn_read_timeout")]
    #[validate(range(min = 1))]
    pub read_timeout_ms: u64,
}

impl OpenVpnConfig {
    /// `host:port` of the management interface.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for OpenVpnConfig {
    fn default() -> Self {
        Self {
            host: default_vpn_host(),
            port: default_vpn_port(),
            config_file: default_vpn_config_file(),
            service: default_vpn_service(),
            connect_timeout_ms: default_vpn_connect_timeout(),
            read_timeout_ms: default_vpn_read_timeout(),
        }
    }
}

fn default_limit_file() -> PathBuf {
    PathBuf::from("/root/usuarios.db")
}

fn default_limiter_tool() -> String {
    "vps-cli".to_string()
}

fn default_passwd_file() -> PathBuf {
    PathBuf::from("/etc/passwd")
}

fn default_min_uid() -> u32 {
    1000
}

fn default_command_timeout() -> u64 {
    10
}

fn default_scan_concurrency() -> usize {
    8
}

fn default_vpn_host() -> String {
    "127.0.0.1".to_string()
}

fn default_vpn_port() -> u16 {
    7505
}

fn default_vpn_config_file() -> PathBuf {
    PathBuf::from("/etc/openvpn/server.conf")
}

fn default_vpn_service() -> String {
    "openvpn".to_string()
}

fn default_vpn_connect_timeout() -> u64 {
    2000
}

fn default_vpn_read_timeout() -> u64 {
    5000
}
