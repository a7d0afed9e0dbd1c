//! Per-connection request/response loop
//!
//! A [`Connection`] owns the byte buffer, parser state and session for one
//! accepted socket; nothing here is shared with other connections. The loop
//! walks each request through parse, route and dispatch, translating parser
//! failures into their status codes:
//!
//! - `Malformed(..)` -> 400
//! - `TooLarge(RequestLine)` -> 414
//! - `TooLarge(HeaderSection)` -> 400
//! - `TooLarge(Body)` -> 413
//!
//! Well-formed requests keep the connection open (HTTP/1.1 default);
//! rejections always answer and then close, since the stream can no longer
//! be trusted to be in sync.

use super::limits::Limits;
use super::message::{Request, Response, Status};
use super::parser::{LimitKind, ParseOutcome, RequestParser};
use super::reader::ByteReader;
use super::router::{RouteDecision, Router};
use super::session::{HttpSession, SessionOps};
use super::{Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, warn};

/// Bytes requested from the session per read
const READ_CHUNK: usize = 4096;

/// What the ingest loop produced for one request slot
enum Step {
    /// A complete, validated request
    Request(Request),
    /// Answer with this status and close
    Reject(Status),
    /// Peer is gone or idle; close without answering
    Disconnect,
}

/// Handler for one accepted connection
pub struct Connection<S: SessionOps> {
    session: HttpSession<S>,
    reader: ByteReader,
    limits: Limits,
}

impl<S: SessionOps> Connection<S> {
    /// Take ownership of an accepted transport
    pub fn new(ops: S, limits: Limits) -> Self {
        Connection {
            session: HttpSession::new(ops, &limits),
            reader: ByteReader::new(limits.buffer_ceiling()),
            limits,
        }
    }

    /// Serve requests until the connection closes
    ///
    /// This is the single entry point an accept loop needs. Every request
    /// that reaches the parser is answered; the only silent exits are a
    /// clean peer close between requests and an idle timeout with nothing
    /// buffered.
    pub fn serve(&mut self, router: &Router) -> Result<()> {
        loop {
            match self.next_request()? {
                Step::Request(request) => {
                    let close = request.wants_close();
                    let response = dispatch(router, &request);
                    self.write_response(response)?;
                    if close {
                        break;
                    }
                }
                Step::Reject(status) => {
                    self.write_response(reject_response(status))?;
                    self.drain();
                    break;
                }
                Step::Disconnect => break,
            }
        }
        self.session.close()
    }

    /// Drive the parser until it produces a terminal outcome
    fn next_request(&mut self) -> Result<Step> {
        let mut parser = RequestParser::new(self.limits);

        loop {
            match parser.advance(&mut self.reader) {
                ParseOutcome::Complete(request) => return Ok(Step::Request(request)),
                ParseOutcome::Malformed(kind) => {
                    debug!(?kind, "malformed request");
                    return Ok(Step::Reject(Status::BAD_REQUEST));
                }
                ParseOutcome::TooLarge(limit) => {
                    warn!(?limit, "request exceeded a configured limit");
                    return Ok(Step::Reject(limit_status(limit)));
                }
                ParseOutcome::Incomplete => {
                    match self.reader.read_more(&mut self.session, READ_CHUNK) {
                        Ok(0) => {
                            if parser.started() || !self.reader.is_empty() {
                                debug!("peer closed mid-request");
                            }
                            return Ok(Step::Disconnect);
                        }
                        Ok(_) => {}
                        Err(Error::Timeout) => {
                            // A stalled request is a client error; a silent
                            // keep-alive connection is just done
                            if parser.started() || !self.reader.is_empty() {
                                return Ok(Step::Reject(Status::BAD_REQUEST));
                            }
                            return Ok(Step::Disconnect);
                        }
                        Err(Error::BufferOverflow) => {
                            return Ok(Step::Reject(Status::BAD_REQUEST));
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// Discard pending input before closing a rejected connection
    ///
    /// Closing with unread bytes in the receive buffer makes the stack send
    /// a reset, which can destroy the response before the peer reads it.
    /// The drain is bounded; a peer that keeps sending past the cap gets
    /// the reset it asked for.
    fn drain(&mut self) {
        const DRAIN_CAP: usize = 256 * 1024;

        let mut scratch = [0u8; 4096];
        let mut total = 0;
        self.session
            .set_read_timeout(Some(Duration::from_millis(100)));
        while total < DRAIN_CAP {
            match self.session.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(n) => total += n,
            }
        }
    }

    /// Write a response, guaranteeing body framing
    fn write_response(&mut self, mut response: Response) -> Result<()> {
        if !response.headers().contains("Content-Length") {
            let len = response.body().len().to_string();
            response.headers_mut().insert("Content-Length", len);
        }

        let wire = response.to_wire();
        let mut written = 0;
        while written < wire.len() {
            let n = self.session.write(&wire[written..])?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            written += n;
        }

        debug!(status = response.status().code(), "response written");
        Ok(())
    }
}

/// Route a request and run its handler
fn dispatch(router: &Router, request: &Request) -> Response {
    match router.decide(request.path()) {
        RouteDecision::Found(handler) => {
            match catch_unwind(AssertUnwindSafe(|| handler(request))) {
                Ok(response) => response,
                Err(_) => {
                    warn!(path = request.path(), "handler panicked");
                    status_response(Status::INTERNAL_SERVER_ERROR)
                }
            }
        }
        // Both fold to 404 so a probe cannot tell a protected target from a
        // missing one
        RouteDecision::NotFound | RouteDecision::Forbidden => {
            status_response(Status::NOT_FOUND)
        }
    }
}

fn limit_status(limit: LimitKind) -> Status {
    match limit {
        LimitKind::RequestLine => Status::REQUEST_URI_TOO_LONG,
        LimitKind::HeaderSection => Status::BAD_REQUEST,
        LimitKind::Body => Status::REQUEST_ENTITY_TOO_LARGE,
    }
}

/// Plain status response with the reason phrase as body
fn status_response(status: Status) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(format!("{}\n", status))
        .build()
}

/// Status response for protocol rejections; announces the close
fn reject_response(status: Status) -> Response {
    let mut response = status_response(status);
    response.headers_mut().insert("Connection", "close");
    response
}
