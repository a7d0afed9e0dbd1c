//! Session operations abstraction
//!
//! [`SessionOps`] is the seam between the HTTP layer and the transport. The
//! connection handler only ever talks to an [`HttpSession`], which wraps the
//! transport with poll-based timeouts, so a stalled peer turns into
//! [`Error::Timeout`] instead of a blocked thread holding its buffer forever.

use super::limits::Limits;
use super::{Error, Result};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::AsRawFd;
use std::time::Duration;

/// Transport operations for one connection
pub trait SessionOps {
    /// Wait until the session is ready for the requested operation
    ///
    /// Returns false when the timeout elapses first.
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> Result<bool>;

    /// Read data from the session
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write data to the session
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Close the session
    fn close(&mut self) -> Result<()>;
}

/// Readiness to poll for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvents {
    Read,
    Write,
}

/// Transport wrapper applying timeouts to every operation
pub struct HttpSession<S: SessionOps> {
    ops: S,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl<S: SessionOps> HttpSession<S> {
    /// Wrap a transport with the timeouts configured in `limits`
    pub fn new(ops: S, limits: &Limits) -> Self {
        HttpSession {
            ops,
            read_timeout: Some(limits.read_timeout),
            write_timeout: Some(limits.write_timeout),
        }
    }

    /// Override the read timeout; `None` waits forever
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Read data, failing with [`Error::Timeout`] when the peer stalls
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.ops.poll(PollEvents::Read, self.read_timeout)? {
            return Err(Error::Timeout);
        }
        self.ops.read(buf)
    }

    /// Write data, failing with [`Error::Timeout`] when the peer stalls
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.ops.poll(PollEvents::Write, self.write_timeout)? {
            return Err(Error::Timeout);
        }
        self.ops.write(buf)
    }

    /// Close the underlying transport
    pub fn close(&mut self) -> Result<()> {
        self.ops.close()
    }
}

/// Millisecond timeout argument for `libc::poll`
///
/// `None` maps to -1 (wait indefinitely); durations beyond `i32::MAX`
/// milliseconds clamp instead of wrapping negative.
fn poll_timeout_ms(timeout: Option<Duration>) -> i32 {
    match timeout {
        Some(d) => i32::try_from(d.as_millis()).unwrap_or(i32::MAX),
        None => -1,
    }
}

/// Plain TCP transport
pub struct TcpSessionOps {
    stream: TcpStream,
}

impl TcpSessionOps {
    /// Wrap an accepted TCP stream
    pub fn new(stream: TcpStream) -> Self {
        TcpSessionOps { stream }
    }
}

impl SessionOps for TcpSessionOps {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> Result<bool> {
        use libc::{poll, pollfd, POLLIN, POLLOUT};

        let mut pfd = pollfd {
            fd: self.stream.as_raw_fd(),
            events: match events {
                PollEvents::Read => POLLIN,
                PollEvents::Write => POLLOUT,
            },
            revents: 0,
        };

        let result = unsafe { poll(&mut pfd as *mut pollfd, 1, poll_timeout_ms(timeout)) };
        if result < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        Ok(result > 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).map_err(Error::from)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write(buf).map_err(Error::from)
    }

    fn close(&mut self) -> Result<()> {
        use std::net::Shutdown;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // The peer may already have torn the connection down
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }
}
