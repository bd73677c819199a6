//! Session run loop
//!
//! Drives one streaming connection: broadcast the newcomer, write the
//! handshake, then loop draining the mailbox with an idle-keepalive
//! race until the peer disconnects or the mailbox closes. Teardown
//! (registry removal, then the `deleted` broadcast, in that order) is
//! owned by an RAII guard so it runs exactly once on every exit path,
//! including task cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::event::Event;
use crate::fanout::Fanout;
use crate::registry::{ClientEntry, ClientRegistry};

use super::sink::{EventSink, SinkClosed};
use super::state::SessionState;

/// Why the steady-state loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// The transport reported the peer gone
    PeerGone,
    /// The mailbox closed (overflow drop or shutdown)
    MailboxClosed,
}

/// Removes the client and announces its departure when dropped.
///
/// Dropping is the only teardown path, so cleanup cannot run twice and
/// cannot be skipped, no matter where the session future stops.
struct TeardownGuard {
    registry: Arc<ClientRegistry>,
    fanout: Fanout,
    id: String,
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Ok(entry) = self.registry.remove(&self.id) {
            entry.close_mailbox();
            self.fanout.broadcast(Arc::new(Event::deleted(&self.id)));
            tracing::info!(client_id = %self.id, "Client session closed");
        }
    }
}

/// One `/events` connection
pub struct Session {
    state: SessionState,
    entry: Arc<ClientEntry>,
    mailbox: mpsc::Receiver<Arc<Event>>,
    fanout: Fanout,
    idle_timeout: Duration,
    retry_interval: Duration,
    _guard: TeardownGuard,
}

impl Session {
    /// Wrap an admitted registry entry into a session.
    ///
    /// From this point the entry's lifetime is tied to the session: if
    /// the session is dropped before or during `run`, the guard still
    /// removes the entry and broadcasts `deleted`.
    pub fn new(
        entry: Arc<ClientEntry>,
        mailbox: mpsc::Receiver<Arc<Event>>,
        registry: Arc<ClientRegistry>,
        fanout: Fanout,
        idle_timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        let state = SessionState::new(entry.id(), entry.remote());
        let guard = TeardownGuard {
            registry,
            fanout: fanout.clone(),
            id: entry.id().to_string(),
        };
        Self {
            state,
            entry,
            mailbox,
            fanout,
            idle_timeout,
            retry_interval,
            _guard: guard,
        }
    }

    /// Assigned client id
    pub fn id(&self) -> &str {
        &self.state.id
    }

    /// Run the session to completion.
    ///
    /// The replay for this client is already queued in the mailbox by
    /// the registry; it drains ahead of any live event once the loop
    /// starts.
    pub async fn run<S: EventSink>(mut self, mut sink: S) {
        tracing::info!(
            client_id = %self.state.id,
            remote = %self.state.remote,
            "Client connected"
        );

        // Existing clients learn of the newcomer.
        self.fanout
            .broadcast(Arc::new(Event::created(self.entry.data().to_value())));

        if self.handshake(&mut sink).await.is_ok() {
            self.state.open();
            let exit = self.stream(&mut sink).await;
            tracing::debug!(
                client_id = %self.state.id,
                exit = ?exit,
                events = self.state.events_sent,
                keepalives = self.state.keepalives_sent,
                "Session loop exited"
            );
        }

        self.state.close();
        // Registry removal and the deleted broadcast happen in the
        // guard's drop, right after this frame unwinds.
        self.state.closed();
    }

    async fn handshake<S: EventSink>(&mut self, sink: &mut S) -> Result<(), SinkClosed> {
        let banner = Event::comment(format!("Howdy {}!", self.state.id));
        sink.send(banner.encoded()).await?;
        self.state.on_event_sent();

        sink.send(Event::retry(self.retry_interval).encoded()).await?;
        self.state.on_event_sent();

        Ok(())
    }

    async fn stream<S: EventSink>(&mut self, sink: &mut S) -> Exit {
        loop {
            match timeout(self.idle_timeout, self.mailbox.recv()).await {
                Ok(Some(event)) => {
                    if sink.send(event.encoded()).await.is_err() {
                        return Exit::PeerGone;
                    }
                    self.state.on_event_sent();
                }
                Ok(None) => return Exit::MailboxClosed,
                Err(_) => {
                    // Idle: write a pure keepalive so the transport does
                    // not time the connection out. Never closes anything.
                    if sink.send(Event::keepalive().encoded()).await.is_err() {
                        return Exit::PeerGone;
                    }
                    self.state.on_keepalive();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio_test::assert_ok;

    const IDLE: Duration = Duration::from_secs(30);
    const RETRY: Duration = Duration::from_secs(10);

    fn setup() -> (Arc<ClientRegistry>, Fanout) {
        let registry = Arc::new(ClientRegistry::new());
        let fanout = Fanout::new(Arc::clone(&registry));
        (registry, fanout)
    }

    fn connect(
        registry: &Arc<ClientRegistry>,
        fanout: &Fanout,
        id: &str,
        idle_timeout: Duration,
    ) -> (mpsc::Receiver<Bytes>, tokio::task::JoinHandle<()>) {
        let (entry, mailbox) = registry.admit(id, "test").unwrap();
        let session = Session::new(
            entry,
            mailbox,
            Arc::clone(registry),
            fanout.clone(),
            idle_timeout,
            RETRY,
        );
        let (tx, rx) = mpsc::channel::<Bytes>(64);
        let handle = tokio::spawn(session.run(tx));
        (rx, handle)
    }

    async fn frame(rx: &mut mpsc::Receiver<Bytes>) -> String {
        let bytes = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no frame within deadline")
            .expect("stream ended");
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_handshake_banner_and_retry() {
        let (registry, fanout) = setup();
        let (mut rx, _handle) = connect(&registry, &fanout, "100", IDLE);

        assert_eq!(frame(&mut rx).await, ": Howdy 100!\n\n");
        assert_eq!(frame(&mut rx).await, "retry: 10000\n\n");
    }

    #[tokio::test]
    async fn test_replay_before_live_events_and_deleted_on_disconnect() {
        let (registry, fanout) = setup();

        let (mut a_rx, a_handle) = connect(&registry, &fanout, "100", IDLE);
        assert_eq!(frame(&mut a_rx).await, ": Howdy 100!\n\n");
        assert_eq!(frame(&mut a_rx).await, "retry: 10000\n\n");
        // Fan-out includes the sender itself, so A hears its own created.
        let own = frame(&mut a_rx).await;
        assert!(own.starts_with("event: created\n"));
        assert!(own.contains("\"id\":\"100\""));

        let (mut b_rx, _b_handle) = connect(&registry, &fanout, "200", IDLE);

        // B's handshake, then the replay of A before anything else.
        assert_eq!(frame(&mut b_rx).await, ": Howdy 200!\n\n");
        assert_eq!(frame(&mut b_rx).await, "retry: 10000\n\n");
        let replay = frame(&mut b_rx).await;
        assert!(replay.starts_with("event: created\n"));
        assert!(replay.contains("\"id\":\"100\""));

        // B also hears its own created broadcast, strictly after the replay.
        let own = frame(&mut b_rx).await;
        assert!(own.starts_with("event: created\n"));
        assert!(own.contains("\"id\":\"200\""));

        // A hears about B.
        let created = frame(&mut a_rx).await;
        assert!(created.starts_with("event: created\n"));
        assert!(created.contains("\"id\":\"200\""));

        assert_eq!(registry.len(), 2);

        // Cancel A's task; the teardown guard must still run.
        a_handle.abort();
        let _ = a_handle.await;

        assert!(registry.get("100").is_err());
        assert_eq!(registry.len(), 1);

        let deleted = frame(&mut b_rx).await;
        assert_eq!(deleted, "event: deleted\ndata: {\"id\":\"100\"}\n\n");
    }

    #[tokio::test]
    async fn test_idle_session_emits_keepalive_and_stays_open() {
        let (registry, fanout) = setup();
        let (mut rx, _handle) = connect(&registry, &fanout, "100", Duration::from_millis(20));

        assert_eq!(frame(&mut rx).await, ": Howdy 100!\n\n");
        assert_eq!(frame(&mut rx).await, "retry: 10000\n\n");
        // Drain the session's own created broadcast.
        assert!(frame(&mut rx).await.starts_with("event: created\n"));

        // Two idle periods, two keepalives, connection still up.
        assert_eq!(frame(&mut rx).await, ":\n\n");
        assert_eq!(frame(&mut rx).await, ":\n\n");
        assert_eq!(registry.len(), 1);

        // Still delivers real events after keepalives.
        fanout.broadcast(Arc::new(Event::updated(serde_json::json!({"id": "100"}))));
        let mut seen = frame(&mut rx).await;
        while seen == ":\n\n" {
            seen = frame(&mut rx).await;
        }
        assert_eq!(seen, "event: updated\ndata: {\"id\":\"100\"}\n\n");
    }

    #[tokio::test]
    async fn test_peer_disconnect_triggers_cleanup() {
        let (registry, fanout) = setup();

        let (mut a_rx, _a_handle) = connect(&registry, &fanout, "100", IDLE);
        assert_eq!(frame(&mut a_rx).await, ": Howdy 100!\n\n");
        assert_eq!(frame(&mut a_rx).await, "retry: 10000\n\n");

        let (b_rx, _b_handle) = connect(&registry, &fanout, "200", IDLE);
        assert_ok!(registry.get("200"));

        // B's peer goes away; the session notices on its next write.
        drop(b_rx);
        fanout.broadcast(Arc::new(Event::keepalive()));

        // A sees the broadcast, B's created, then exactly one deleted.
        let mut deleted_count = 0;
        loop {
            let text = frame(&mut a_rx).await;
            if text == "event: deleted\ndata: {\"id\":\"200\"}\n\n" {
                deleted_count += 1;
                break;
            }
        }
        assert_eq!(deleted_count, 1);
        assert!(registry.get("200").is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_membership_matches_open_sessions() {
        let (registry, fanout) = setup();
        assert_eq!(registry.len(), 0);

        let (_a_rx, a_handle) = connect(&registry, &fanout, "100", IDLE);
        let (_b_rx, b_handle) = connect(&registry, &fanout, "200", IDLE);
        let (_c_rx, c_handle) = connect(&registry, &fanout, "300", IDLE);
        assert_eq!(registry.len(), 3);

        b_handle.abort();
        let _ = b_handle.await;
        assert_eq!(registry.len(), 2);

        a_handle.abort();
        c_handle.abort();
        let _ = a_handle.await;
        let _ = c_handle.await;
        assert_eq!(registry.len(), 0);
    }
}
