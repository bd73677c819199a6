//! Live event-stream broadcast relay
//!
//! Clients hold a long-lived `text/event-stream` connection; each
//! connection is an ephemeral record in a shared registry, and every
//! create/update/delete of a record fans out as a real-time event to
//! every connected client. A plain request/response surface
//! (`GET`/`PUT /data/{id}`) reads and mutates records by id, with
//! mutation feeding the same fan-out.
//!
//! # Data flow
//!
//! ```text
//! GET /events ──► admit(id) ──► replay queued ──► created broadcast
//!                    │
//!                    ▼
//!            [Session loop: mailbox.recv vs idle timer]
//!                    │                        ▲
//!                    ▼                        │
//!            encoded events to peer    Fanout::broadcast
//!                    │                        ▲
//!                    ▼                        │
//!            teardown: remove(id) ──► deleted broadcast
//! ```
//!
//! Ordering guarantees: per-mailbox FIFO, replay-before-live for a new
//! joiner, no total order across clients.
//!
//! # Example
//!
//! ```rust,no_run
//! use sse_relay::{RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> sse_relay::Result<()> {
//!     let config = ServerConfig::default();
//!     let server = RelayServer::new(config);
//!     server.run().await
//! }
//! ```

pub mod error;
pub mod event;
pub mod fanout;
pub mod registry;
pub mod server;
pub mod session;
pub mod util;

pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use fanout::Fanout;
pub use registry::{ClientData, ClientEntry, ClientRegistry, RegistryError};
pub use server::{build_router, AppState, RelayServer, ServerConfig};
pub use session::{EventSink, Session, SessionPhase, SessionState, SinkClosed};
