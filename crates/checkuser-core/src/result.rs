//! Convenience result type alias for CheckUser.

use crate::error::AppError;

/// A specialized `Result` type for CheckUser operations.
pub type AppResult<T> = Result<T, AppError>;
