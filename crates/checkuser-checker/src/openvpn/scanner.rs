//! Incremental reader for `status` dumps.

use bytes::{Bytes, BytesMut};

/// Marker closing a `status` response.
pub const TERMINATOR: &[u8] = b"\r\nEND\r\n";

/// Accumulates `status` output chunk by chunk and detects the terminator,
/// including one split across reads.
#[derive(Debug, Default)]
pub struct StatusScanner {
    buffer: BytesMut,
    complete: bool,
}

impl StatusScanner {
    /// Create an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk. Returns `true` once the terminator has
    /// been seen.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        if self.complete {
            return true;
        }

        // Re-scan the tail of the previous data so a split terminator is found.
        let start = self.buffer.len().saturating_sub(TERMINATOR.len() - 1);
        self.buffer.extend_from_slice(chunk);
        self.complete = contains(&self.buffer[start..], TERMINATOR);
        self.complete
    }

    /// Whether the terminator has been seen.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Bytes received so far.
    pub fn received_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Finish scanning and keep everything received.
    pub fn finish(self) -> StatusDump {
        StatusDump {
            data: self.buffer.freeze(),
        }
    }
}

/// A complete or peer-closed `status` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDump {
    data: Bytes,
}

impl StatusDump {
    /// Sessions of `username` in this dump.
    pub fn session_count(&self, username: &str) -> u32 {
        session_count(&self.data, username)
    }
}

/// Sessions of `username` in a `status` dump.
///
/// Every client appears twice, once in the client list and once in the
/// routing table, so the substring count is halved.
pub fn session_count(buffer: &[u8], username: &str) -> u32 {
    count_occurrences(buffer, username.as_bytes()) / 2
}

/// Non-overlapping occurrences of `needle` in `haystack`.
fn count_occurrences(haystack: &[u8], needle: &[u8]) -> u32 {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }

    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
