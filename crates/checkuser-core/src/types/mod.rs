//! Shared data types exchanged between the checker and the server.

pub mod account;
pub mod outcome;
pub mod report;

pub use account::SystemAccount;
pub use outcome::{ConnectionTotal, KillOutcome};
pub use report::{UNKNOWN, UserReport};
