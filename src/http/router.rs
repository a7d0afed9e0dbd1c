//! Path routing with traversal protection
//!
//! The router owns the table of registered paths and the normalization step
//! that runs before any lookup. Normalization resolves `.` and `..`
//! segments against a virtual root; a path that would escape the root is
//! [`RouteDecision::Forbidden`]. Policy above this layer maps `Forbidden`
//! and `NotFound` to the same 404 on the wire, so a probing client cannot
//! tell a protected file from a missing one.

use super::message::{Request, Response};
use tracing::warn;

/// Application handler invoked on a routed request
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// Outcome of resolving a request path
pub enum RouteDecision<'r> {
    /// A registered handler matched the normalized path
    Found(&'r Handler),
    /// Valid path, nothing registered there
    NotFound,
    /// The path tried to escape the served root
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Exact,
    Prefix,
}

struct Route {
    path: String,
    kind: MatchKind,
    handler: Handler,
}

/// Table of registered paths, fixed after startup
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Router::default()
    }

    /// Register a handler for an exact path
    pub fn route<H>(&mut self, path: impl Into<String>, handler: H)
    where
        H: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            path: path.into(),
            kind: MatchKind::Exact,
            handler: Box::new(handler),
        });
    }

    /// Register a handler for a path and everything beneath it
    pub fn route_prefix<H>(&mut self, path: impl Into<String>, handler: H)
    where
        H: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            path: path.into(),
            kind: MatchKind::Prefix,
            handler: Box::new(handler),
        });
    }

    /// Resolve a raw request path to a handler
    pub fn decide(&self, raw_path: &str) -> RouteDecision<'_> {
        let Some(path) = normalize_path(raw_path) else {
            warn!(path = raw_path, "rejected path escaping the served root");
            return RouteDecision::Forbidden;
        };

        for route in &self.routes {
            let matched = match route.kind {
                MatchKind::Exact => path == route.path,
                MatchKind::Prefix => {
                    path == route.path
                        || path
                            .strip_prefix(route.path.as_str())
                            .is_some_and(|rest| route.path == "/" || rest.starts_with('/'))
                }
            };
            if matched {
                return RouteDecision::Found(&route.handler);
            }
        }

        RouteDecision::NotFound
    }
}

/// Normalize a path against the virtual root
///
/// Collapses empty and `.` segments and resolves `..`. Returns `None` when
/// the path is not rooted at `/` or when a `..` would climb above the root.
pub fn normalize_path(raw: &str) -> Option<String> {
    if !raw.starts_with('/') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Some("/".to_string());
    }
    Some(format!("/{}", segments.join("/")))
}
