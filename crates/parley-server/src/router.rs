use crate::presence::PresenceRegistry;
use parley::protocol::{Event, Response};
use std::sync::Arc;
use tracing::debug;

/// Best-effort event delivery to online identities.
///
/// Delivery is at-most-once: an offline target or a full connection buffer
/// drops the event silently (logged at debug). Durable state already lives
/// in the store; clients resynchronize from it on reconnect.
#[derive(Clone)]
pub struct EventRouter {
    presence: Arc<PresenceRegistry>,
}

impl EventRouter {
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self { presence }
    }

    pub fn deliver(&self, user_id: &str, event: Event) {
        let Some(sender) = self.presence.sender_for(user_id) else {
            debug!(user = %user_id, "event target offline, dropped");
            return;
        };
        if sender.try_send(Response::Event { event }).is_err() {
            debug!(user = %user_id, "event buffer full, dropped");
        }
    }
}
