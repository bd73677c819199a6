//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::registry::DEFAULT_MAILBOX_CAPACITY;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Bound on each client mailbox; a full mailbox drops that client
    pub mailbox_capacity: usize,

    /// How long a session may sit idle before a keepalive comment is sent
    pub idle_timeout: Duration,

    /// Reconnect interval advertised to clients in the handshake
    pub retry_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".parse().unwrap(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            idle_timeout: Duration::from_secs(30),
            retry_interval: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the per-client mailbox bound
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// Set the idle keepalive interval
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the advertised reconnect interval
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}
