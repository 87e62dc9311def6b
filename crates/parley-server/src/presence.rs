use dashmap::DashMap;
use parley::protocol::{Event, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

struct Entry {
    epoch: u64,
    sender: mpsc::Sender<Response>,
}

/// In-memory registry mapping each online identity to its live connection.
///
/// One entry per identity: registering while an older connection is still
/// mapped replaces it (last write wins), and the replaced connection stops
/// receiving events. Every registration gets a fresh epoch so a replaced
/// connection's disconnect cleanup cannot evict its successor.
///
/// Uses `DashMap` for lock-free concurrent access to the entries.
pub struct PresenceRegistry {
    entries: DashMap<String, Entry>,
    next_epoch: AtomicU64,
    max_connections: usize,
}

impl PresenceRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            entries: DashMap::new(),
            next_epoch: AtomicU64::new(1),
            max_connections,
        }
    }

    /// Register an identity's connection, replacing any previous one.
    /// Returns the registration epoch, or `None` if at capacity.
    /// Broadcasts the updated online set.
    pub fn register(&self, user_id: &str, sender: mpsc::Sender<Response>) -> Option<u64> {
        if self.entries.len() >= self.max_connections && !self.entries.contains_key(user_id) {
            return None;
        }
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        self.entries
            .insert(user_id.to_string(), Entry { epoch, sender });
        self.broadcast_online();
        Some(epoch)
    }

    /// Unregister an identity, but only if it is still mapped to the
    /// registration identified by `epoch`. A stale disconnect (the identity
    /// has since reconnected elsewhere) is a no-op. Returns whether the
    /// entry was removed; broadcasts the online set if it was.
    pub fn unregister(&self, user_id: &str, epoch: u64) -> bool {
        let removed = self
            .entries
            .remove_if(user_id, |_, entry| entry.epoch == epoch)
            .is_some();
        if removed {
            self.broadcast_online();
        }
        removed
    }

    /// The sender for an online identity, cloned so the caller doesn't hold
    /// the map entry.
    pub fn sender_for(&self, user_id: &str) -> Option<mpsc::Sender<Response>> {
        self.entries.get(user_id).map(|e| e.value().sender.clone())
    }

    /// Snapshot of currently online identity ids.
    pub fn online_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn online_count(&self) -> usize {
        self.entries.len()
    }

    /// Push the full online set to every live connection. Connections with
    /// full buffers miss this snapshot; they catch up on the next change.
    fn broadcast_online(&self) {
        let online = self.online_ids();
        for entry in self.entries.iter() {
            let event = Response::Event {
                event: Event::OnlineUsers {
                    online: online.clone(),
                },
            };
            if entry.value().sender.try_send(event).is_err() {
                debug!(user = %entry.key(), "presence broadcast dropped");
            }
        }
    }
}
