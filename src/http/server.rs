//! Accept loop driving one thread per connection
//!
//! Connections share nothing but the immutable [`Limits`] copy and the
//! router behind an `Arc`, so no locking is needed anywhere in the request
//! path.

use super::connection::Connection;
use super::limits::Limits;
use super::router::Router;
use super::session::TcpSessionOps;
use super::Result;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// HTTP server bound to a listener
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    limits: Limits,
}

impl Server {
    /// Bind a listener and take ownership of the route table
    pub fn bind(addr: impl std::net::ToSocketAddrs, router: Router, limits: Limits) -> Result<Self> {
        Ok(Server {
            listener: crate::net::bind(addr)?,
            router: Arc::new(router),
            limits,
        })
    }

    /// The address actually bound, useful with port 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one thread per connection
    pub fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };
            debug!(%peer, "connection accepted");

            let router = Arc::clone(&self.router);
            let limits = self.limits;
            thread::spawn(move || {
                let mut conn = Connection::new(TcpSessionOps::new(stream), limits);
                if let Err(e) = conn.serve(&router) {
                    debug!(%peer, error = %e, "connection ended with transport error");
                }
            });
        }
    }
}
