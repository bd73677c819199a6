//! Transport sink abstraction
//!
//! The session does not know what transport carries its bytes; it only
//! needs "write one encoded event" and "tell me when the peer is gone".
//! The HTTP layer implements this over the response body channel, tests
//! implement it over an in-memory buffer.

use std::future::Future;

use bytes::Bytes;

/// The peer is gone; no further writes will succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

impl std::fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("event sink closed")
    }
}

impl std::error::Error for SinkClosed {}

/// Write half of a streaming connection
///
/// A successful send means the payload was handed to the transport,
/// which flushes each message as its own body frame.
pub trait EventSink: Send {
    /// Write one encoded event to the peer
    fn send(&mut self, payload: Bytes) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

impl EventSink for tokio::sync::mpsc::Sender<Bytes> {
    async fn send(&mut self, payload: Bytes) -> Result<(), SinkClosed> {
        tokio::sync::mpsc::Sender::send(self, payload)
            .await
            .map_err(|_| SinkClosed)
    }
}
