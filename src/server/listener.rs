//! Relay server listener
//!
//! Owns the registry and fan-out engine, binds the listen address and
//! serves the router until shut down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::fanout::Fanout;
use crate::registry::ClientRegistry;

use super::config::ServerConfig;
use super::router::{build_router, AppState};

/// Event relay server
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    fanout: Fanout,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ClientRegistry::with_capacity(config.mailbox_capacity));
        let fanout = Fanout::new(Arc::clone(&registry));
        Self {
            config,
            registry,
            fanout,
        }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get a broadcast handle over this server's registry
    pub fn fanout(&self) -> Fanout {
        self.fanout.clone()
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    fn app(&self) -> axum::Router {
        build_router(AppState {
            registry: Arc::clone(&self.registry),
            fanout: self.fanout.clone(),
            config: self.config.clone(),
        })
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Relay server listening");

        axum::serve(listener, self.app()).await?;
        Ok(())
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Relay server listening");

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Shutdown complete");
        Ok(())
    }
}
