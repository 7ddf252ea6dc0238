//! Request-line parsing.
//!
//! Only the path of the first line matters: `/<command>/<argument>`.
//! Method, version, and headers are ignored.

use checkuser_core::AppResult;
use checkuser_core::error::AppError;

/// A parsed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Raw path as received, query string included
    pub path: String,
    /// First path segment
    pub command: String,
    /// Second path segment, `None` when absent or empty
    pub argument: Option<String>,
}

impl Request {
    /// Parse the raw bytes read from a connection.
    pub fn parse(data: &[u8]) -> AppResult<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| AppError::request_malformed("Request is not valid UTF-8"))?;

        let line = text.lines().next().unwrap_or_default();
        let path = line
            .split_whitespace()
            .nth(1)
            .filter(|p| p.starts_with('/'))
            .ok_or_else(|| AppError::request_malformed("Request line has no path"))?;

        Ok(Self::from_path(path))
    }

    /// Split a path into command and argument.
    pub fn from_path(path: &str) -> Self {
        let mut segments = path.split('/').skip(1).map(strip_query);
        let command = segments.next().unwrap_or_default().to_string();
        let argument = segments
            .next()
            .filter(|arg| !arg.is_empty())
            .map(str::to_string);

        Self {
            path: path.to_string(),
            command,
            argument,
        }
    }
}

fn strip_query(segment: &str) -> &str {
    segment.split('?').next().unwrap_or_default()
}
