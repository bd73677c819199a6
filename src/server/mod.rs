//! HTTP surface
//!
//! The transport edge of the relay: an axum router exposing the
//! streaming `/events` endpoint and the `/data/{id}` read/mutate pair,
//! plus the listener that binds and serves it. Everything here stays
//! thin; admission, fan-out and the session loop live in the core
//! modules and are handed the connection as early as possible.

mod config;
mod listener;
mod router;

pub use config::ServerConfig;
pub use listener::RelayServer;
pub use router::{build_router, AppState, CLIENT_ID_HEADER};
