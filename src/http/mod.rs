//! HTTP/1.1 request ingestion and response dispatch
//!
//! The pipeline per connection is:
//!
//! ```text
//! Connection -> ByteReader -> RequestParser -> Router -> handler -> Response
//! ```
//!
//! Every stage treats the peer as hostile: the reader caps how much it will
//! buffer, the parser rejects oversized request lines, header sections and
//! bodies before allocating for them, and the router refuses paths that
//! resolve outside the virtual root. Parse and limit failures are data
//! ([`ParseOutcome`]), not errors; [`Error`] is reserved for transport-level
//! conditions. Every request that reaches the parser is answered with a
//! complete HTTP response unless the peer hangs up first.

pub mod connection;
pub mod headers;
pub mod limits;
pub mod message;
pub mod parser;
pub mod reader;
pub mod router;
pub mod server;
pub mod session;

pub use connection::Connection;
pub use headers::Headers;
pub use limits::Limits;
pub use message::{Method, Request, Response, Status, Version};
pub use parser::{LimitKind, MalformedKind, ParseOutcome, RequestParser};
pub use reader::ByteReader;
pub use router::{RouteDecision, Router};
pub use server::Server;
pub use session::{HttpSession, SessionOps, TcpSessionOps};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transport-level errors
///
/// Protocol violations by the peer never show up here; they are resolved
/// into responses by the connection handler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Net(#[from] crate::net::Error),

    #[error("read buffer ceiling exceeded")]
    BufferOverflow,

    #[error("timeout")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,
}

/// Maximum number of headers retained per request
pub const MAX_HEADERS: usize = 64;

/// CRLF line ending
pub const CRLF: &str = "\r\n";
