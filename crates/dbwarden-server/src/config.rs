//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Maximum number of open connections.
    pub max_connections: usize,
    /// Largest request (head plus body) accepted.
    pub max_request_bytes: usize,
    /// Connections idle for longer than this are closed.
    pub idle_timeout: Duration,
    /// Initial capacity of per-connection buffers.
    pub buffer_size: usize,
}

impl ServerConfig {
    /// Creates a configuration listening on `bind_addr` with default limits.
    pub fn new(bind_addr: impl Into<SocketAddr>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_max_request_bytes(mut self, max: usize) -> Self {
        self.max_request_bytes = max;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 256,
            max_request_bytes: 64 * 1024,
            idle_timeout: Duration::from_secs(30),
            buffer_size: 4096,
        }
    }
}
