//! Client registry implementation

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Map;
use tokio::sync::mpsc;

use crate::event::Event;

use super::client::{ClientData, ClientEntry, Delivery};
use super::error::RegistryError;

/// Default bound on each client mailbox
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Central registry of connected clients
///
/// Entries are kept in connection order (oldest first); that order is
/// what replay and fan-out iterate in. Lookups scan linearly, which is
/// fine at realistic connected-client counts.
pub struct ClientRegistry {
    clients: RwLock<Vec<Arc<ClientEntry>>>,
    mailbox_capacity: usize,
}

impl ClientRegistry {
    /// Create a registry with the default mailbox bound
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAILBOX_CAPACITY)
    }

    /// Create a registry with a custom per-client mailbox bound
    pub fn with_capacity(mailbox_capacity: usize) -> Self {
        Self {
            clients: RwLock::new(Vec::new()),
            mailbox_capacity: mailbox_capacity.max(1),
        }
    }

    /// Admit a new client under `id`.
    ///
    /// Returns the inserted entry and the receiving half of its mailbox.
    /// Before the entry becomes visible to anyone else, one `created`
    /// replay event per already-connected peer is enqueued into the new
    /// mailbox, in connection order. Running the replay inside the admit
    /// critical section is what guarantees a late joiner sees the full
    /// membership before any live event: a broadcast can only observe
    /// the new entry after the replay is already queued ahead of it.
    pub fn admit(
        &self,
        id: &str,
        remote: &str,
    ) -> Result<(Arc<ClientEntry>, mpsc::Receiver<Arc<Event>>), RegistryError> {
        let mut clients = self.clients.write();

        if clients.iter().any(|c| c.id() == id) {
            return Err(RegistryError::DuplicateId(id.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.mailbox_capacity);
        let entry = Arc::new(ClientEntry::new(id, remote, tx));

        for peer in clients.iter() {
            let event = Arc::new(Event::created(peer.data().to_value()));
            if entry.deliver(event) != Delivery::Delivered {
                // Replay larger than the mailbox bound; the client is
                // already marked for teardown, nothing more to queue.
                break;
            }
        }

        clients.push(Arc::clone(&entry));

        tracing::info!(
            client_id = %id,
            remote = %remote,
            connected = clients.len(),
            "Client admitted"
        );

        Ok((entry, rx))
    }

    /// Remove a client, returning its entry
    pub fn remove(&self, id: &str) -> Result<Arc<ClientEntry>, RegistryError> {
        let mut clients = self.clients.write();

        let index = clients
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let entry = clients.remove(index);

        tracing::info!(
            client_id = %id,
            connected = clients.len(),
            duration_ms = entry.connected_for().as_millis() as u64,
            "Client removed"
        );

        Ok(entry)
    }

    /// Look up a client by id
    pub fn get(&self, id: &str) -> Result<Arc<ClientEntry>, RegistryError> {
        self.clients
            .read()
            .iter()
            .find(|c| c.id() == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Replace a client's record from caller-supplied fields.
    ///
    /// The id is preserved, defaults fill any field left unset, and the
    /// resulting record is returned for the caller to echo and broadcast.
    pub fn update(
        &self,
        id: &str,
        fields: Map<String, serde_json::Value>,
    ) -> Result<ClientData, RegistryError> {
        let entry = self.get(id)?;
        let data = ClientData::from_fields(id, fields);
        entry.set_data(data.clone());

        tracing::debug!(client_id = %id, "Client data updated");

        Ok(data)
    }

    /// Point-in-time copy of all entries, in connection order.
    ///
    /// Safe to iterate while other sessions admit and remove concurrently.
    pub fn snapshot(&self) -> Vec<Arc<ClientEntry>> {
        self.clients.read().clone()
    }

    /// Number of connected clients
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Whether no clients are connected
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
