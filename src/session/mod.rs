//! Streaming session
//!
//! One session per `/events` connection. The session owns its registry
//! entry from admission to teardown and drives the per-connection state
//! machine: handshake, replay drain, steady-state loop with idle
//! keepalives, and guaranteed cleanup on every exit path.

mod sink;
mod state;
mod stream;

pub use sink::{EventSink, SinkClosed};
pub use state::{SessionPhase, SessionState};
pub use stream::Session;
