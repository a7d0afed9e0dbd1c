//! Hearth - a small HTTP/1.1 server core
//!
//! This crate implements the request-ingestion side of an HTTP/1.1 server:
//! incremental parsing with hard size limits, path routing with traversal
//! protection, and response serialization. It deliberately contains no
//! business logic; applications register handlers on a [`http::Router`] and
//! drive connections through [`http::Server`] or [`http::Connection`].

pub mod http;
pub mod net;
