//! Session inspection for CheckUser.
//!
//! This crate provides:
//! - [`process`]: process-table and account inquiries behind the
//!   [`ProcessQuery`](process::ProcessQuery) trait, with a system and a mock implementation
//! - [`openvpn`]: a client for the OpenVPN management interface
//! - [`limit`]: two-tier connection-limit lookup
//! - [`checker`]: the [`ConnectionChecker`] that combines them into reports
//!
//! Every external failure is converted into a sentinel value here; callers
//! only ever see counts, `-1`, empty lists, or `None`.

pub mod checker;
pub mod exec;
pub mod expiration;
pub mod limit;
pub mod openvpn;
pub mod process;

pub use checker::ConnectionChecker;
pub use limit::LimitStore;
pub use openvpn::ManagementClient;
pub use process::ProcessQuery;
