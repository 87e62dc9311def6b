use crate::error::CoreError;
use crate::now_ms;
use crate::router::EventRouter;
use parley::protocol::{Event, MessageNotification, MessageRecord};
use parley_store::{MediaStore, Store, User};
use tracing::info;
use uuid::Uuid;

/// Send a direct message from `sender` to `receiver_id`.
///
/// At least one of text/image must remain after normalization (whitespace-only
/// text and empty image payloads count as absent). An inline image payload is
/// externalized through the media store before the message is persisted, so a
/// failed upload leaves no message behind. The receiver gets a `newMessage`
/// event with the full record and a `messageNotification` summary if online.
pub fn send_message(
    store: &Store,
    router: &EventRouter,
    media: &dyn MediaStore,
    sender: &User,
    receiver_id: &str,
    text: Option<String>,
    image: Option<String>,
) -> Result<MessageRecord, CoreError> {
    let text = text.filter(|t| !t.trim().is_empty());
    let image = image.filter(|i| !i.is_empty());

    if text.is_none() && image.is_none() {
        return Err(CoreError::EmptyMessage);
    }
    if sender.id == receiver_id {
        return Err(CoreError::SelfMessage);
    }
    if !store.user_exists(receiver_id)? {
        return Err(CoreError::UnknownReceiver);
    }
    if !store.are_contacts(&sender.id, receiver_id)? {
        return Err(CoreError::NotContacts);
    }

    let image = match image {
        Some(payload) => Some(
            media
                .upload(&payload)
                .map_err(|e| CoreError::ImageUploadFailed(e.to_string()))?,
        ),
        None => None,
    };

    let record = MessageRecord {
        id: Uuid::new_v4().to_string(),
        sender_id: sender.id.clone(),
        receiver_id: receiver_id.to_string(),
        text,
        image,
        created_at: now_ms(),
    };
    store.insert_message(&record)?;

    router.deliver(receiver_id, Event::NewMessage(record.clone()));
    router.deliver(
        receiver_id,
        Event::MessageNotification(MessageNotification {
            message_id: record.id.clone(),
            sender_id: sender.id.clone(),
            sender_name: sender.full_name.clone(),
            text: record.text.clone(),
            image: record.image.is_some(),
            timestamp: record.created_at,
        }),
    );
    info!(message = %record.id, from = %sender.id, to = %receiver_id, "message sent");
    Ok(record)
}

/// Full message history between `user_id` and `peer_id`, oldest first.
pub fn messages_with(
    store: &Store,
    user_id: &str,
    peer_id: &str,
) -> Result<Vec<MessageRecord>, CoreError> {
    if !store.user_exists(peer_id)? {
        return Err(CoreError::UnknownReceiver);
    }
    Ok(store.messages_between(user_id, peer_id)?)
}

/// Distinct users `user_id` has exchanged messages with.
pub fn chat_partners(store: &Store, user_id: &str) -> Result<Vec<User>, CoreError> {
    Ok(store.chat_partners_of(user_id)?)
}
