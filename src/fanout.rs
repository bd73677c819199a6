//! Event fan-out engine
//!
//! Delivers one event to every currently registered client's mailbox.
//! Delivery works on a registry snapshot taken at call time: clients
//! admitted afterwards do not receive the broadcast, and a concurrent
//! remove is simply a delivery to a closed mailbox. Per-mailbox order is
//! FIFO; there is no ordering guarantee across mailboxes.
//!
//! Delivery never blocks. A full mailbox closes that client's channel
//! (see [`ClientEntry::deliver`](crate::registry::ClientEntry::deliver)),
//! forcing the slow session into its normal teardown instead of stalling
//! the broadcast for everyone else.

use std::sync::Arc;

use crate::event::Event;
use crate::registry::{ClientRegistry, Delivery};

/// Broadcast handle over a shared registry
#[derive(Clone)]
pub struct Fanout {
    registry: Arc<ClientRegistry>,
}

impl Fanout {
    /// Create a fan-out engine over the given registry
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Enqueue `event` into every registered mailbox.
    ///
    /// Returns the number of mailboxes the event actually reached.
    pub fn broadcast(&self, event: Arc<Event>) -> usize {
        let targets = self.registry.snapshot();
        let mut delivered = 0;

        for entry in &targets {
            if entry.deliver(Arc::clone(&event)) == Delivery::Delivered {
                delivered += 1;
            }
        }

        tracing::debug!(
            targets = targets.len(),
            delivered = delivered,
            kind = ?event.kind(),
            "Broadcast"
        );

        delivered
    }
}

impl std::fmt::Debug for Fanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fanout").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[tokio::test]
    async fn test_broadcast_reaches_every_mailbox_once() {
        let registry = Arc::new(ClientRegistry::new());
        let fanout = Fanout::new(Arc::clone(&registry));

        let (_a, mut ra) = registry.admit("100", "test").unwrap();
        let (_b, mut rb) = registry.admit("200", "test").unwrap();

        // Drain B's replay of A before counting.
        assert!(rb.recv().await.is_some());

        let delivered = fanout.broadcast(Arc::new(Event::deleted("999")));
        assert_eq!(delivered, 2);

        for rx in [&mut ra, &mut rb] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.kind(), Some(EventKind::Deleted));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_per_mailbox_fifo_order() {
        let registry = Arc::new(ClientRegistry::new());
        let fanout = Fanout::new(Arc::clone(&registry));
        let (_a, mut ra) = registry.admit("100", "test").unwrap();

        for n in 0..5 {
            fanout.broadcast(Arc::new(Event::updated(serde_json::json!({ "n": n }))));
        }
        for n in 0..5 {
            let event = ra.recv().await.unwrap();
            assert_eq!(event.payload().unwrap()["n"], n);
        }
    }

    #[tokio::test]
    async fn test_late_joiner_misses_earlier_broadcast() {
        let registry = Arc::new(ClientRegistry::new());
        let fanout = Fanout::new(Arc::clone(&registry));

        fanout.broadcast(Arc::new(Event::keepalive()));
        let (_a, mut ra) = registry.admit("100", "test").unwrap();

        // Only delivery from now on would show up; nothing is pending.
        assert!(ra.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_overflow_drops_only_the_slow_client() {
        let registry = Arc::new(ClientRegistry::with_capacity(2));
        let fanout = Fanout::new(Arc::clone(&registry));

        let (_slow, mut r_slow) = registry.admit("100", "test").unwrap();
        let (_fast, mut r_fast) = registry.admit("200", "test").unwrap();
        assert!(r_fast.recv().await.is_some()); // replay of 100

        // Fill the slow mailbox (capacity 2) while draining the fast one.
        for _ in 0..3 {
            fanout.broadcast(Arc::new(Event::keepalive()));
            assert!(r_fast.try_recv().is_ok());
        }

        // The fast client keeps receiving.
        assert_eq!(fanout.broadcast(Arc::new(Event::keepalive())), 1);
        assert!(r_fast.try_recv().is_ok());

        // The slow client drains its backlog, then sees its mailbox closed.
        assert!(r_slow.recv().await.is_some());
        assert!(r_slow.recv().await.is_some());
        assert!(r_slow.recv().await.is_none());
    }
}
