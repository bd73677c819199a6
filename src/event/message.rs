//! Event types and their canonical text encoding

use std::sync::OnceLock;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;

/// Lifecycle kind carried on a data event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A client joined
    Created,
    /// A client's record changed
    Updated,
    /// A client left
    Deleted,
}

impl EventKind {
    /// Wire name of the kind (the `event:` field value)
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable event source message
///
/// Constructed once, then shared via `Arc` through every mailbox it is
/// delivered to. The encoded form is cached on first use, so the same
/// instance always produces identical bytes.
#[derive(Debug)]
pub struct Event {
    repr: Repr,
    encoded: OnceLock<Bytes>,
}

#[derive(Debug)]
enum Repr {
    Data {
        id: Option<String>,
        kind: Option<EventKind>,
        data: Value,
    },
    Comment {
        message: String,
    },
    Retry {
        wait: Duration,
    },
}

impl Event {
    /// A `created` data event carrying a record snapshot
    pub fn created(data: Value) -> Self {
        Self::data(None, Some(EventKind::Created), data)
    }

    /// An `updated` data event carrying the merged record
    pub fn updated(data: Value) -> Self {
        Self::data(None, Some(EventKind::Updated), data)
    }

    /// A `deleted` data event; the payload is just the departed id
    pub fn deleted(client_id: &str) -> Self {
        Self::data(
            None,
            Some(EventKind::Deleted),
            serde_json::json!({ "id": client_id }),
        )
    }

    /// A data event with explicit id/kind fields
    pub fn data(id: Option<String>, kind: Option<EventKind>, data: Value) -> Self {
        Self::from_repr(Repr::Data { id, kind, data })
    }

    /// A comment event carrying the given text
    pub fn comment(message: impl Into<String>) -> Self {
        Self::from_repr(Repr::Comment {
            message: message.into(),
        })
    }

    /// An empty comment, sent solely to keep an idle connection alive
    pub fn keepalive() -> Self {
        Self::comment("")
    }

    /// A reconnect interval hint
    pub fn retry(wait: Duration) -> Self {
        Self::from_repr(Repr::Retry { wait })
    }

    fn from_repr(repr: Repr) -> Self {
        Self {
            repr,
            encoded: OnceLock::new(),
        }
    }

    /// Lifecycle kind, if this is a data event that carries one
    pub fn kind(&self) -> Option<EventKind> {
        match &self.repr {
            Repr::Data { kind, .. } => *kind,
            _ => None,
        }
    }

    /// JSON payload, if this is a data event
    pub fn payload(&self) -> Option<&Value> {
        match &self.repr {
            Repr::Data { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Encoded wire bytes, cached after the first call
    pub fn encoded(&self) -> Bytes {
        self.encoded.get_or_init(|| encode(&self.repr)).clone()
    }
}

/// Encode one message block.
///
/// `serde_json::Map` is backed by a `BTreeMap` (the `preserve_order`
/// feature is not enabled), so object keys serialize sorted and the
/// compact output is canonical.
fn encode(repr: &Repr) -> Bytes {
    let mut out = String::new();

    match repr {
        Repr::Data { id, kind, data } => {
            if let Some(id) = id {
                out.push_str("id: ");
                out.push_str(id);
                out.push('\n');
            }
            if let Some(kind) = kind {
                out.push_str("event: ");
                out.push_str(kind.as_str());
                out.push('\n');
            }
            let text = data.to_string();
            // Compact JSON is a single line, but embedded newlines in the
            // text must still split into separate data: lines.
            for line in text.split('\n') {
                out.push_str("data: ");
                out.push_str(line);
                out.push('\n');
            }
        }
        Repr::Comment { message } => {
            if message.is_empty() {
                out.push_str(":\n");
            } else {
                for line in message.split('\n') {
                    out.push_str(": ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        Repr::Retry { wait } => {
            out.push_str("retry: ");
            out.push_str(&wait.as_millis().to_string());
            out.push('\n');
        }
    }

    out.push('\n');
    Bytes::from(out)
}
