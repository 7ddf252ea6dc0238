//! JSON responses written back to clients.

use http::StatusCode;
use serde_json::{Value, json};

/// Status plus JSON body, rendered as a minimal HTTP/1.1 response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Response status
    pub status: StatusCode,
    /// JSON body
    pub body: Value,
}

impl Response {
    /// 200 with a command payload.
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// 403 for requests that never produced a usable path.
    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: json!({ "error": "Forbidden" }),
        }
    }

    /// 500 carrying a dispatch error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": message.into() }),
        }
    }

    /// Serialize to the bytes sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| "{}".to_string());
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or_default(),
            body.len()
        );

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body.as_bytes());
        bytes
    }
}
