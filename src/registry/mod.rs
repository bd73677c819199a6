//! Client registry
//!
//! The registry is the authoritative, order-preserving set of currently
//! connected clients. Every streaming session admits itself on connect
//! and removes itself on teardown; the fan-out engine and the data
//! endpoints read and mutate records through it.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ClientRegistry>
//!                   ┌──────────────────────────┐
//!                   │ clients: Vec<            │
//!                   │   Arc<ClientEntry {      │
//!                   │     id, remote,          │
//!                   │     data: ClientData,    │
//!                   │     mailbox: mpsc::Tx,   │
//!                   │   }>                     │
//!                   │ >  (connection order)    │
//!                   └────────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            │                   │                   │
//!            ▼                   ▼                   ▼
//!       [Session A]         [Session B]         [Session C]
//!       mailbox.recv()      mailbox.recv()      mailbox.recv()
//!            ▲                   ▲                   ▲
//!            └──────── Fanout::broadcast ────────────┘
//! ```
//!
//! Every operation is one atomic critical section with no await inside,
//! so admit/remove/update/snapshot are never observed half-done. Multi
//! step traversals (replay, fan-out) work on snapshots.

mod client;
mod error;
mod store;

pub use client::{ClientData, ClientEntry, Delivery};
pub use error::RegistryError;
pub use store::{ClientRegistry, DEFAULT_MAILBOX_CAPACITY};
