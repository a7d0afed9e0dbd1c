//! TCP listener plumbing
//!
//! Socket setup lives here so the HTTP layer never touches raw sockets
//! directly. Listeners are built through `socket2` to get control over
//! address reuse and the accept backlog.

use socket2::{Domain, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

/// Result type for network operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network setup errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid listen address: {0}")]
    Addr(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Accept backlog for listeners
const BACKLOG: i32 = 128;

/// Bind a TCP listener with SO_REUSEADDR set
///
/// Resolves the first address produced by `addr` and returns a blocking
/// listener ready for `accept`.
pub fn bind(addr: impl ToSocketAddrs) -> Result<TcpListener> {
    let addr = addr
        .to_socket_addrs()
        .map_err(|e| Error::Addr(e.to_string()))?
        .next()
        .ok_or_else(|| Error::Addr("no address resolved".to_string()))?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)
        .map_err(|source| Error::Bind { addr, source })?;
    socket
        .set_reuse_address(true)
        .map_err(|source| Error::Bind { addr, source })?;
    socket
        .bind(&addr.into())
        .map_err(|source| Error::Bind { addr, source })?;
    socket
        .listen(BACKLOG)
        .map_err(|source| Error::Listen { addr, source })?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    #[test]
    fn test_bind_ephemeral() {
        let listener = bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn test_bound_listener_accepts() {
        let listener = bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"ping").unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"pong");
        });

        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        stream.write_all(b"pong").unwrap();

        handle.join().unwrap();
    }

    #[test]
    fn test_bind_bad_address() {
        let result = bind("not-an-address");
        assert!(matches!(result, Err(Error::Addr(_))));
    }
}
