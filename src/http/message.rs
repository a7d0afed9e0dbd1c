//! HTTP message types
//!
//! Requests are only ever constructed by the parser, after the request line
//! and all headers have validated; there is no public way to build a
//! partially-parsed request. Responses have a builder and serialize
//! themselves to wire format.

use super::{Headers, CRLF};
use std::fmt;

/// HTTP request methods
///
/// The well-known set is matched case-sensitively. Anything else is carried
/// as an opaque `Extension` token; whether an extension method is serviceable
/// is the router's and handler's decision, not the parser's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Extension(String),
}

impl Method {
    /// Parse a method token
    ///
    /// Returns `None` for tokens that are not valid at all (empty, or
    /// containing non-visible-ASCII bytes).
    pub fn from_token(token: &str) -> Option<Self> {
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        Some(match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            other => Method::Extension(other.to_string()),
        })
    }

    /// The method token as it appears on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Extension(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP protocol version
///
/// Only HTTP/1.1 is accepted on ingest; any other version token is a parse
/// failure, so this is the only variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    #[default]
    Http11,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        "HTTP/1.1"
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
}

impl Status {
    pub const OK: Status = Status { code: 200 };
    pub const BAD_REQUEST: Status = Status { code: 400 };
    pub const NOT_FOUND: Status = Status { code: 404 };
    pub const REQUEST_ENTITY_TOO_LARGE: Status = Status { code: 413 };
    pub const REQUEST_URI_TOO_LONG: Status = Status { code: 414 };
    pub const INTERNAL_SERVER_ERROR: Status = Status { code: 500 };

    /// Create a status from a numeric code
    pub fn new(code: u16) -> Self {
        Status { code }
    }

    /// Get the numeric code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Canonical reason phrase
    ///
    /// The 413/414 phrases follow RFC 2616 wording, which is what existing
    /// clients of this server match on.
    pub fn reason_phrase(&self) -> &'static str {
        match self.code {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Request Entity Too Large",
            414 => "Request-URI Too Long",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            _ => "Unknown",
        }
    }

    /// Check if this is a success status (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Check if this is a client error status (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason_phrase())
    }
}

/// A fully parsed HTTP request
///
/// Owned by the connection handler for the duration of building the
/// response, then dropped.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    version: Version,
    headers: Headers,
    body: Vec<u8>,
}

impl Request {
    /// Construct a validated request; only the parser calls this
    pub(crate) fn new(
        method: Method,
        path: String,
        query: Option<String>,
        version: Version,
        headers: Headers,
        body: Vec<u8>,
    ) -> Self {
        Request {
            method,
            path,
            query,
            version,
            headers,
            body,
        }
    }

    /// The request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw path, percent-encoding untouched
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query component, without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The protocol version
    pub fn version(&self) -> Version {
        self.version
    }

    /// The request headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The request body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the client asked for the connection to be closed
    pub fn wants_close(&self) -> bool {
        self.headers
            .get("Connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("close"))
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    status: Status,
    reason: String,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// Create an empty response with the given status
    pub fn new(status: Status) -> Self {
        Response {
            status,
            reason: status.reason_phrase().to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Create a builder for constructing responses
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Get the status code
    pub fn status(&self) -> Status {
        self.status
    }

    /// Get the reason phrase
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get the body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serialize to wire format
    ///
    /// Status line, each header as `Name: Value`, a blank line, then the
    /// body, all CRLF-terminated.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128 + self.body.len());

        buf.extend_from_slice(Version::Http11.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.status.code().to_string().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.reason.as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());

        for (name, value) in self.headers.iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(CRLF.as_bytes());
        }

        buf.extend_from_slice(CRLF.as_bytes());
        buf.extend_from_slice(&self.body);

        buf
    }
}

/// Builder for HTTP responses
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    status: Option<Status>,
    reason: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Set the status code
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Override the reason phrase
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the response
    pub fn build(self) -> Response {
        let status = self.status.unwrap_or(Status::OK);
        Response {
            status,
            reason: self
                .reason
                .unwrap_or_else(|| status.reason_phrase().to_string()),
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_token() {
        assert_eq!(Method::from_token("GET"), Some(Method::Get));
        assert_eq!(Method::from_token("PUT"), Some(Method::Put));
        // Lowercase is not the known method; it is an extension token
        assert_eq!(
            Method::from_token("get"),
            Some(Method::Extension("get".to_string()))
        );
        assert_eq!(
            Method::from_token("GIBBERISH"),
            Some(Method::Extension("GIBBERISH".to_string()))
        );
        assert_eq!(Method::from_token(""), None);
        assert_eq!(Method::from_token("GE T"), None);
    }

    #[test]
    fn test_status_reason_phrases_exact() {
        // Clients grep for these exact status lines
        assert_eq!(Status::OK.to_string(), "200 OK");
        assert_eq!(Status::NOT_FOUND.to_string(), "404 Not Found");
        assert_eq!(
            Status::REQUEST_ENTITY_TOO_LARGE.to_string(),
            "413 Request Entity Too Large"
        );
        assert_eq!(
            Status::REQUEST_URI_TOO_LONG.to_string(),
            "414 Request-URI Too Long"
        );
        assert_eq!(Status::BAD_REQUEST.to_string(), "400 Bad Request");
    }

    #[test]
    fn test_status_classes() {
        assert!(Status::OK.is_success());
        assert!(!Status::OK.is_client_error());
        assert!(Status::NOT_FOUND.is_client_error());
        assert_eq!(Status::new(404), Status::NOT_FOUND);
        assert_eq!(Status::new(999).reason_phrase(), "Unknown");
    }

    #[test]
    fn test_request_wants_close() {
        let mut headers = Headers::new();
        headers.insert("Connection", "Close");
        let req = Request::new(
            Method::Get,
            "/".to_string(),
            None,
            Version::Http11,
            headers,
            Vec::new(),
        );
        assert!(req.wants_close());

        let req = Request::new(
            Method::Get,
            "/".to_string(),
            None,
            Version::Http11,
            Headers::new(),
            Vec::new(),
        );
        assert!(!req.wants_close());
    }

    #[test]
    fn test_response_to_wire() {
        let resp = Response::builder()
            .status(Status::OK)
            .header("Content-Length", "5")
            .header("Content-Type", "text/plain")
            .body(&b"Hello"[..])
            .build();

        let wire = String::from_utf8(resp.to_wire()).unwrap();
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("Content-Length: 5\r\n"));
        assert!(wire.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn test_response_default_reason() {
        let resp = Response::new(Status::REQUEST_URI_TOO_LONG);
        assert_eq!(resp.reason(), "Request-URI Too Long");
        let wire = String::from_utf8(resp.to_wire()).unwrap();
        assert!(wire.starts_with("HTTP/1.1 414 Request-URI Too Long\r\n"));
    }
}
