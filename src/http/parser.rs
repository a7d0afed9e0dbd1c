//! Incremental HTTP request parsing
//!
//! [`RequestParser`] consumes bytes from a [`ByteReader`] and produces a
//! [`ParseOutcome`]. Limit checks happen at every stage boundary, before the
//! offending input is buffered in full: an unterminated request line is
//! rejected as soon as it passes the request-line ceiling, and an oversized
//! declared `Content-Length` is rejected without reading any of the body.
//!
//! Outcomes are terminal except `Incomplete`: once a parser has reported
//! `Malformed` or `TooLarge` it stays failed, and once it has produced a
//! request it is done. The connection handler builds a fresh parser per
//! request.

use super::limits::Limits;
use super::message::{Method, Request, Version};
use super::reader::ByteReader;
use super::Headers;
use std::mem;

/// Which limit an oversized request tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    RequestLine,
    HeaderSection,
    Body,
}

/// Why a request failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    RequestLine,
    Version,
    HeaderLine,
    ContentLength,
}

/// Result of one parsing step
#[derive(Debug)]
pub enum ParseOutcome {
    /// A fully validated request, body included
    Complete(Request),
    /// More bytes are needed
    Incomplete,
    /// The peer violated the protocol; answer 400
    Malformed(MalformedKind),
    /// The peer exceeded a configured ceiling
    TooLarge(LimitKind),
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Malformed(MalformedKind),
    TooLarge(LimitKind),
}

impl Failure {
    fn outcome(self) -> ParseOutcome {
        match self {
            Failure::Malformed(kind) => ParseOutcome::Malformed(kind),
            Failure::TooLarge(kind) => ParseOutcome::TooLarge(kind),
        }
    }
}

/// Validated request line, carried through the later parse states
#[derive(Debug)]
struct RequestLine {
    method: Method,
    path: String,
    query: Option<String>,
}

#[derive(Debug)]
enum State {
    RequestLine,
    Headers(RequestLine),
    Body(RequestLine, usize),
    Done,
    Failed(Failure),
}

/// Incremental parser for one HTTP/1.1 request
pub struct RequestParser {
    limits: Limits,
    state: State,
    headers: Headers,
    header_bytes: usize,
}

impl RequestParser {
    /// Create a parser for a single request
    pub fn new(limits: Limits) -> Self {
        RequestParser {
            limits,
            state: State::RequestLine,
            headers: Headers::new(),
            header_bytes: 0,
        }
    }

    /// Consume whatever the reader has buffered and report progress
    ///
    /// Call again after feeding the reader when this returns `Incomplete`.
    pub fn advance(&mut self, reader: &mut ByteReader) -> ParseOutcome {
        loop {
            match mem::replace(&mut self.state, State::Done) {
                State::RequestLine => match reader.take_line() {
                    Some(line) => {
                        if line.len() > self.limits.max_request_line {
                            return self.fail(Failure::TooLarge(LimitKind::RequestLine));
                        }
                        match Self::accept_request_line(&line) {
                            Ok(request_line) => self.state = State::Headers(request_line),
                            Err(kind) => return self.fail(Failure::Malformed(kind)),
                        }
                    }
                    None => {
                        // Reject a runaway line before waiting for its CRLF
                        if reader.buffered() > self.limits.max_request_line {
                            return self.fail(Failure::TooLarge(LimitKind::RequestLine));
                        }
                        self.state = State::RequestLine;
                        return ParseOutcome::Incomplete;
                    }
                },
                State::Headers(request_line) => match reader.take_line() {
                    Some(line) => {
                        self.header_bytes += line.len() + 2;
                        if self.header_bytes > self.limits.max_header_bytes {
                            return self.fail(Failure::TooLarge(LimitKind::HeaderSection));
                        }
                        if line.is_empty() {
                            match self.declared_body_length() {
                                Ok(length) => self.state = State::Body(request_line, length),
                                Err(failure) => return self.fail(failure),
                            }
                        } else {
                            let Ok(text) = std::str::from_utf8(&line) else {
                                return self.fail(Failure::Malformed(MalformedKind::HeaderLine));
                            };
                            match Headers::parse_header_line(text) {
                                Some((name, value)) => {
                                    self.headers.insert(name, value);
                                    self.state = State::Headers(request_line);
                                }
                                None => {
                                    return self
                                        .fail(Failure::Malformed(MalformedKind::HeaderLine))
                                }
                            }
                        }
                    }
                    None => {
                        if self.header_bytes + reader.buffered() > self.limits.max_header_bytes {
                            return self.fail(Failure::TooLarge(LimitKind::HeaderSection));
                        }
                        self.state = State::Headers(request_line);
                        return ParseOutcome::Incomplete;
                    }
                },
                State::Body(request_line, length) => match reader.take_exact(length) {
                    Some(body) => {
                        return ParseOutcome::Complete(Request::new(
                            request_line.method,
                            request_line.path,
                            request_line.query,
                            Version::Http11,
                            mem::take(&mut self.headers),
                            body.to_vec(),
                        ));
                    }
                    None => {
                        self.state = State::Body(request_line, length);
                        return ParseOutcome::Incomplete;
                    }
                },
                State::Done => return ParseOutcome::Incomplete,
                State::Failed(failure) => {
                    self.state = State::Failed(failure);
                    return failure.outcome();
                }
            }
        }
    }

    /// True once any line of the current request has been consumed
    pub fn started(&self) -> bool {
        !matches!(self.state, State::RequestLine)
    }

    fn fail(&mut self, failure: Failure) -> ParseOutcome {
        self.state = State::Failed(failure);
        failure.outcome()
    }

    fn accept_request_line(line: &[u8]) -> Result<RequestLine, MalformedKind> {
        let text = std::str::from_utf8(line).map_err(|_| MalformedKind::RequestLine)?;
        let parts: Vec<&str> = text.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(MalformedKind::RequestLine);
        }

        let method = Method::from_token(parts[0]).ok_or(MalformedKind::RequestLine)?;
        if parts[2] != Version::Http11.as_str() {
            return Err(MalformedKind::Version);
        }

        let (path, query) = match parts[1].split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (parts[1].to_string(), None),
        };

        Ok(RequestLine {
            method,
            path,
            query,
        })
    }

    /// Validate Content-Length once the blank line has arrived
    fn declared_body_length(&self) -> Result<usize, Failure> {
        let Some(value) = self.headers.get("Content-Length") else {
            return Ok(0);
        };

        let declared: u64 = value
            .parse()
            .map_err(|_| Failure::Malformed(MalformedKind::ContentLength))?;
        if declared > self.limits.max_body as u64 {
            return Err(Failure::TooLarge(LimitKind::Body));
        }

        Ok(declared as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;
    use crate::http::Status;

    fn parse_all(limits: Limits, input: &[u8]) -> ParseOutcome {
        let mut reader = ByteReader::new(limits.buffer_ceiling());
        reader.extend(input).unwrap();
        RequestParser::new(limits).advance(&mut reader)
    }

    #[test]
    fn test_simple_get() {
        let outcome = parse_all(
            Limits::default(),
            b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n",
        );
        let ParseOutcome::Complete(req) = outcome else {
            panic!("expected complete request, got {:?}", outcome);
        };
        assert_eq!(*req.method(), Method::Get);
        assert_eq!(req.path(), "/");
        assert_eq!(req.query(), None);
        assert_eq!(req.version(), Version::Http11);
        assert_eq!(req.headers().get("Host"), Some("localhost"));
        assert!(req.body().is_empty());
    }

    #[test]
    fn test_incremental_feeding() {
        let limits = Limits::default();
        let mut reader = ByteReader::new(limits.buffer_ceiling());
        let mut parser = RequestParser::new(limits);

        reader.extend(b"GET /cha").unwrap();
        assert!(matches!(
            parser.advance(&mut reader),
            ParseOutcome::Incomplete
        ));

        reader.extend(b"t HTTP/1.1\r\nHost: lo").unwrap();
        assert!(matches!(
            parser.advance(&mut reader),
            ParseOutcome::Incomplete
        ));

        reader.extend(b"calhost\r\n\r\n").unwrap();
        let ParseOutcome::Complete(req) = parser.advance(&mut reader) else {
            panic!("expected complete request");
        };
        assert_eq!(req.path(), "/chat");
    }

    #[test]
    fn test_query_split() {
        let outcome = parse_all(
            Limits::default(),
            b"GET /search?q=a&page=2 HTTP/1.1\r\n\r\n",
        );
        let ParseOutcome::Complete(req) = outcome else {
            panic!("expected complete request");
        };
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=a&page=2"));
    }

    #[test]
    fn test_header_value_with_colons() {
        let outcome = parse_all(
            Limits::default(),
            b"GET / HTTP/1.1\r\nHost: localhost\r\nX-Custom-Header: Weird:Value\r\n\r\n",
        );
        let ParseOutcome::Complete(req) = outcome else {
            panic!("expected complete request");
        };
        assert_eq!(req.headers().get("X-Custom-Header"), Some("Weird:Value"));
    }

    #[test]
    fn test_extension_method_accepted() {
        let outcome = parse_all(Limits::default(), b"GIBBERISH / HTTP/1.1\r\n\r\n");
        let ParseOutcome::Complete(req) = outcome else {
            panic!("expected complete request");
        };
        assert_eq!(
            *req.method(),
            Method::Extension("GIBBERISH".to_string())
        );
    }

    #[test]
    fn test_wrong_version_is_malformed() {
        let outcome = parse_all(Limits::default(), b"GET / HTTP/1.0\r\n\r\n");
        assert!(matches!(
            outcome,
            ParseOutcome::Malformed(MalformedKind::Version)
        ));

        let outcome = parse_all(Limits::default(), b"GET / HTTPS/9\r\n\r\n");
        assert!(matches!(
            outcome,
            ParseOutcome::Malformed(MalformedKind::Version)
        ));
    }

    #[test]
    fn test_short_request_line_is_malformed() {
        let outcome = parse_all(Limits::default(), b"GET /\r\n\r\n");
        assert!(matches!(
            outcome,
            ParseOutcome::Malformed(MalformedKind::RequestLine)
        ));
    }

    #[test]
    fn test_bare_lf_request_is_malformed() {
        // Lines separated by bare \n collapse into one oversized "request
        // line" when the first real CRLF finally shows up
        let outcome = parse_all(
            Limits::default(),
            b"GET / HTTP/1.1\nHost: localhost\nX-Custom-Header: No backslash r\n\r\n",
        );
        assert!(matches!(
            outcome,
            ParseOutcome::Malformed(MalformedKind::RequestLine)
        ));
    }

    #[test]
    fn test_uri_over_limit_rejected_without_crlf() {
        let limits = Limits {
            max_request_line: 64,
            ..Limits::default()
        };
        let mut reader = ByteReader::new(limits.buffer_ceiling());
        let mut parser = RequestParser::new(limits);

        // No CRLF anywhere: the parser must not wait for one
        reader.extend(b"GET /").unwrap();
        reader.extend("EnMycketStorURI".repeat(20).as_bytes()).unwrap();
        let outcome = parser.advance(&mut reader);
        assert!(matches!(
            outcome,
            ParseOutcome::TooLarge(LimitKind::RequestLine)
        ));

        // Terminal outcomes never regress
        reader.extend(b" HTTP/1.1\r\n\r\n").unwrap();
        assert!(matches!(
            parser.advance(&mut reader),
            ParseOutcome::TooLarge(LimitKind::RequestLine)
        ));
    }

    #[test]
    fn test_uri_over_limit_with_crlf() {
        let limits = Limits {
            max_request_line: 32,
            ..Limits::default()
        };
        let long = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(64));
        let outcome = parse_all(limits, long.as_bytes());
        assert!(matches!(
            outcome,
            ParseOutcome::TooLarge(LimitKind::RequestLine)
        ));
    }

    #[test]
    fn test_header_section_over_limit() {
        let limits = Limits {
            max_header_bytes: 128,
            ..Limits::default()
        };
        let mut request = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..16 {
            request.extend_from_slice(format!("X-Padding-{}: {}\r\n", i, "x".repeat(16)).as_bytes());
        }
        request.extend_from_slice(b"\r\n");
        let outcome = parse_all(limits, &request);
        assert!(matches!(
            outcome,
            ParseOutcome::TooLarge(LimitKind::HeaderSection)
        ));
    }

    #[test]
    fn test_unterminated_header_over_limit() {
        let limits = Limits {
            max_header_bytes: 64,
            ..Limits::default()
        };
        let mut reader = ByteReader::new(limits.buffer_ceiling());
        let mut parser = RequestParser::new(limits);

        reader.extend(b"GET / HTTP/1.1\r\nX-Run-On: ").unwrap();
        reader.extend("y".repeat(128).as_bytes()).unwrap();
        let outcome = parser.advance(&mut reader);
        assert!(matches!(
            outcome,
            ParseOutcome::TooLarge(LimitKind::HeaderSection)
        ));
    }

    #[test]
    fn test_header_line_without_colon_is_malformed() {
        let outcome = parse_all(
            Limits::default(),
            b"GET / HTTP/1.1\r\nthis is not a header\r\n\r\n",
        );
        assert!(matches!(
            outcome,
            ParseOutcome::Malformed(MalformedKind::HeaderLine)
        ));
    }

    #[test]
    fn test_invalid_content_length_is_malformed() {
        let outcome = parse_all(
            Limits::default(),
            b"GET / HTTP/1.1\r\nHost: localhost\r\nContent-Length: lots\r\n\r\nGanska mycket",
        );
        assert!(matches!(
            outcome,
            ParseOutcome::Malformed(MalformedKind::ContentLength)
        ));
    }

    #[test]
    fn test_declared_body_over_limit_rejected_early() {
        let limits = Limits {
            max_body: 1024,
            ..Limits::default()
        };
        // Headers only; not a single body byte is sent
        let outcome = parse_all(
            limits,
            b"PUT / HTTP/1.1\r\nContent-Length: 1048576\r\n\r\n",
        );
        assert!(matches!(outcome, ParseOutcome::TooLarge(LimitKind::Body)));
    }

    #[test]
    fn test_body_parsed_to_declared_length() {
        let limits = Limits::default();
        let mut reader = ByteReader::new(limits.buffer_ceiling());
        let mut parser = RequestParser::new(limits);

        reader
            .extend(b"POST / HTTP/1.1\r\nContent-Length: 26\r\n\r\n")
            .unwrap();
        assert!(matches!(
            parser.advance(&mut reader),
            ParseOutcome::Incomplete
        ));

        reader.extend(b"name=Stormy_Daniels&age=30EXTRA").unwrap();
        let ParseOutcome::Complete(req) = parser.advance(&mut reader) else {
            panic!("expected complete request");
        };
        assert_eq!(req.body(), b"name=Stormy_Daniels&age=30");
        // Surplus bytes stay buffered for the next request
        assert_eq!(reader.buffered(), 5);
    }

    #[test]
    fn test_parser_is_done_after_complete() {
        let limits = Limits::default();
        let mut reader = ByteReader::new(limits.buffer_ceiling());
        let mut parser = RequestParser::new(limits);

        reader
            .extend(b"GET / HTTP/1.1\r\n\r\nGET /chat HTTP/1.1\r\n\r\n")
            .unwrap();
        let ParseOutcome::Complete(req) = parser.advance(&mut reader) else {
            panic!("expected complete request");
        };
        assert_eq!(req.path(), "/");

        // A finished parser never touches the next pipelined request
        assert!(matches!(
            parser.advance(&mut reader),
            ParseOutcome::Incomplete
        ));
        assert_eq!(reader.buffered(), "GET /chat HTTP/1.1\r\n\r\n".len());
    }

    #[test]
    fn test_response_wire_reparses_identically() {
        // The response serializer and the header tokenizer must agree, even
        // for values containing colons
        let resp = Response::builder()
            .status(Status::OK)
            .header("Content-Length", "0")
            .header("X-Custom-Header", "Weird:Value")
            .header("Location", "http://example.com:8080/x")
            .build();

        let wire = resp.to_wire();
        let text = std::str::from_utf8(&wire).unwrap();
        let mut lines = text.split("\r\n");
        lines.next().unwrap(); // status line

        let mut reparsed = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            reparsed.push(Headers::parse_header_line(line).unwrap());
        }

        let original: Vec<_> = resp
            .headers()
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(reparsed, original);
    }
}
