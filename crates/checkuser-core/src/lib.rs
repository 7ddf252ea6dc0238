//! # checkuser-core
//!
//! Core crate for CheckUser. Contains configuration schemas, the shared
//! report/account types exchanged between the checker and the server,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other CheckUser crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
