//! Capped incremental byte buffer
//!
//! Each connection owns one [`ByteReader`]. It accumulates bytes from the
//! socket and hands them out line by line or in exact-length slices, but it
//! never grows past its ceiling: once full, further reads fail with
//! [`Error::BufferOverflow`] instead of allocating. This is what bounds peak
//! memory per connection regardless of how much the peer sends.

use super::session::{HttpSession, SessionOps};
use super::{Error, Result};
use bytes::BytesMut;

/// Size of the scratch buffer used per socket read
const READ_CHUNK: usize = 4096;

/// Buffered reader with a hard size ceiling
pub struct ByteReader {
    buf: BytesMut,
    ceiling: usize,
}

impl ByteReader {
    /// Create a reader that will never buffer more than `ceiling` bytes
    pub fn new(ceiling: usize) -> Self {
        ByteReader {
            buf: BytesMut::with_capacity(READ_CHUNK.min(ceiling)),
            ceiling,
        }
    }

    /// Number of bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True if no bytes are buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append bytes, enforcing the ceiling
    pub fn extend(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buf.len() + bytes.len() > self.ceiling {
            return Err(Error::BufferOverflow);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Read newly available bytes from the session into the buffer
    ///
    /// Appends at most `max_bytes` and returns the count read; 0 signals
    /// end of stream. Fails with [`Error::BufferOverflow`] if the buffer is
    /// already at its ceiling.
    pub fn read_more<S: SessionOps>(
        &mut self,
        session: &mut HttpSession<S>,
        max_bytes: usize,
    ) -> Result<usize> {
        let headroom = self.ceiling.saturating_sub(self.buf.len());
        if headroom == 0 {
            return Err(Error::BufferOverflow);
        }

        let mut chunk = vec![0u8; max_bytes.min(headroom).min(READ_CHUNK)];
        let n = session.read(&mut chunk)?;
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Take one line if a CRLF is buffered
    ///
    /// Returns the line without its CRLF, consuming through the terminator.
    /// Consumes nothing when no full line is available yet.
    pub fn take_line(&mut self) -> Option<BytesMut> {
        let pos = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let mut line = self.buf.split_to(pos + 2);
        line.truncate(pos);
        Some(line)
    }

    /// Take exactly `n` bytes once they are buffered
    pub fn take_exact(&mut self, n: usize) -> Option<BytesMut> {
        if self.buf.len() < n {
            return None;
        }
        Some(self.buf.split_to(n))
    }
}
