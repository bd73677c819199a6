//! Event source wire messages
//!
//! The relay speaks the `text/event-stream` framing: UTF-8 text, one
//! message per block, each block terminated by a blank line. Three
//! message shapes exist:
//!
//! - **Data** — a JSON payload with an optional `id:` and `event:` line,
//!   carrying record lifecycle notices (`created`/`updated`/`deleted`).
//! - **Comment** — non-semantic text (`: …`), used for the handshake
//!   banner and idle keepalives.
//! - **Retry** — a reconnect interval hint (`retry: <ms>`).
//!
//! Encoding is canonical and memoized: JSON payloads serialize compact
//! with sorted keys, and the encoded bytes are cached on the event so a
//! single instance fanned out to N mailboxes encodes exactly once.

mod message;

pub use message::{Event, EventKind};
