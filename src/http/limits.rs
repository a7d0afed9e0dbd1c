//! Input size limits and connection timeouts
//!
//! A [`Limits`] value is built once at startup and copied into every
//! connection; nothing mutates it afterwards. Defaults are conservative on
//! purpose: a peer that wants to send more than these ceilings gets a 4xx
//! response, not a bigger allocation.

use std::time::Duration;

/// Process-wide parsing limits and per-connection timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length of the request line in bytes, CRLF excluded.
    /// Exceeding it yields 414 before the line is fully read.
    pub max_request_line: usize,

    /// Maximum total size of the header section in bytes, including
    /// per-line CRLFs and the terminating blank line.
    pub max_header_bytes: usize,

    /// Maximum request body size in bytes. A larger declared
    /// `Content-Length` yields 413 without reading the body.
    pub max_body: usize,

    /// Idle timeout for socket reads. A connection that stalls mid-request
    /// longer than this is answered 400 and closed.
    pub read_timeout: Duration,

    /// Timeout for socket writes.
    pub write_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_request_line: 8 * 1024,
            max_header_bytes: 32 * 1024,
            max_body: 1024 * 1024,
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl Limits {
    /// Hard ceiling for a connection's read buffer
    ///
    /// Large enough to hold the largest request these limits admit, so the
    /// parser's own checks always fire before the buffer refuses to grow.
    pub fn buffer_ceiling(&self) -> usize {
        self.max_request_line + self.max_header_bytes + self.max_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = Limits::default();
        assert_eq!(limits.max_request_line, 8192);
        assert_eq!(limits.max_header_bytes, 32768);
        assert_eq!(limits.max_body, 1048576);
    }

    #[test]
    fn test_buffer_ceiling_covers_largest_request() {
        let limits = Limits::default();
        assert!(limits.buffer_ceiling() >= limits.max_request_line + limits.max_body);
    }
}
