//! Client record and mailbox types
//!
//! A `ClientEntry` is the per-connection record the registry owns while
//! the client is connected: identity, the open-ended data payload, and
//! the mailbox that fan-out writes into and the owning session drains.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::event::Event;
use crate::util;

/// The JSON-able record a client presents to its peers
///
/// A fixed core (`id`, `text`, `color`) plus an open map for any extra
/// fields a caller sends; unknown fields pass through updates unchanged.
/// `id` is server-authoritative and cannot be overwritten by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientData {
    pub id: String,
    pub text: String,
    pub color: String,
    pub extra: Map<String, Value>,
}

impl ClientData {
    /// Fresh record for a newly admitted client, all defaults
    pub fn new(id: &str) -> Self {
        Self::from_fields(id, Map::new())
    }

    /// Build a record from caller-supplied fields.
    ///
    /// Any `id` in the fields is discarded in favor of the given one.
    /// Missing `text` defaults to the id, missing `color` to a random
    /// RGBA value; a known field carrying a non-string value falls back
    /// to its default the same way. Everything else lands in `extra`.
    pub fn from_fields(id: &str, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        let text = match fields.remove("text") {
            Some(Value::String(text)) => text,
            _ => id.to_string(),
        };
        let color = match fields.remove("color") {
            Some(Value::String(color)) => color,
            _ => util::random_color(),
        };
        Self {
            id: id.to_string(),
            text,
            color,
            extra: fields,
        }
    }

    /// JSON object form of the record.
    ///
    /// Built through `serde_json::Map`, which keeps keys sorted, so the
    /// compact serialization of the returned value is canonical.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert("text".into(), Value::String(self.text.clone()));
        map.insert("color".into(), Value::String(self.color.clone()));
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

/// Outcome of one mailbox delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Event enqueued
    Delivered,
    /// Mailbox already closed; the session is tearing down
    Closed,
    /// Mailbox was full; the sender was dropped to force the slow
    /// session into teardown instead of stalling fan-out
    Overflowed,
}

/// A connected client's registry record
pub struct ClientEntry {
    id: String,
    remote: String,
    connected_at: Instant,
    data: RwLock<ClientData>,
    mailbox: Mutex<Option<mpsc::Sender<Arc<Event>>>>,
}

impl ClientEntry {
    pub(super) fn new(id: &str, remote: &str, mailbox: mpsc::Sender<Arc<Event>>) -> Self {
        Self {
            id: id.to_string(),
            remote: remote.to_string(),
            connected_at: Instant::now(),
            data: RwLock::new(ClientData::new(id)),
            mailbox: Mutex::new(Some(mailbox)),
        }
    }

    /// Assigned client id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Caller-identifying metadata captured at connect time
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// How long this client has been connected
    pub fn connected_for(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Current record snapshot
    pub fn data(&self) -> ClientData {
        self.data.read().clone()
    }

    pub(super) fn set_data(&self, data: ClientData) {
        *self.data.write() = data;
    }

    /// Enqueue an event into this client's mailbox.
    ///
    /// Never blocks: a full mailbox closes the channel instead, which
    /// wakes the owning session out of its recv and into teardown.
    pub fn deliver(&self, event: Arc<Event>) -> Delivery {
        let mut mailbox = self.mailbox.lock();
        let Some(tx) = mailbox.as_ref() else {
            return Delivery::Closed;
        };
        match tx.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => {
                *mailbox = None;
                tracing::warn!(
                    client_id = %self.id,
                    remote = %self.remote,
                    "Mailbox full, dropping client"
                );
                Delivery::Overflowed
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                *mailbox = None;
                Delivery::Closed
            }
        }
    }

    /// Drop the mailbox sender so the owning session's recv terminates
    pub fn close_mailbox(&self) {
        *self.mailbox.lock() = None;
    }
}

impl std::fmt::Debug for ClientEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientEntry")
            .field("id", &self.id)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}
