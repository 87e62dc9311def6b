use crate::error::CoreError;
use crate::now_ms;
use crate::router::EventRouter;
use parley::protocol::{Event, FriendRequestRecord};
use parley_store::{RequestOutcome, ResolveOutcome, Store};
use tracing::info;

/// Send a friend request from `sender_id` to `receiver_id`.
///
/// The pair checks and the write happen atomically in the store, so at most
/// one request per pair is ever pending even under concurrent sends. A
/// rejected request between the pair is reopened under its original id, with
/// the direction reassigned to the new sender. The receiver is notified if
/// online.
pub fn send_request(
    store: &Store,
    router: &EventRouter,
    sender_id: &str,
    receiver_id: &str,
) -> Result<FriendRequestRecord, CoreError> {
    if sender_id == receiver_id {
        return Err(CoreError::SelfRequest);
    }
    let sender = store.find_user(sender_id)?.ok_or(CoreError::AccountGone)?;
    if !store.user_exists(receiver_id)? {
        return Err(CoreError::UnknownReceiver);
    }

    let record = match store.open_request(sender_id, receiver_id, now_ms())? {
        RequestOutcome::Opened(record) => record,
        RequestOutcome::AlreadyContacts => return Err(CoreError::AlreadyContacts),
        RequestOutcome::DuplicatePending => return Err(CoreError::DuplicatePending),
    };

    router.deliver(
        receiver_id,
        Event::FriendRequest {
            request_id: record.id.clone(),
            sender: sender.public(),
        },
    );
    info!(request = %record.id, from = %sender_id, to = %receiver_id, "friend request sent");
    Ok(record)
}

/// Accept or reject a friend request addressed to `responder_id`.
///
/// The pending check and the resolution happen atomically in the store:
/// a request resolves exactly once, and accepting adds each party to the
/// other's contact set in the same transaction. The responder's profile is
/// loaded up front so a missing account is reported before anything is
/// written. The original sender is notified of the outcome if online.
pub fn respond(
    store: &Store,
    router: &EventRouter,
    request_id: &str,
    responder_id: &str,
    accept: bool,
) -> Result<FriendRequestRecord, CoreError> {
    let responder = store
        .find_user(responder_id)?
        .ok_or(CoreError::AccountGone)?;

    let record = match store.resolve_request(request_id, responder_id, accept, now_ms())? {
        ResolveOutcome::Resolved(record) => record,
        ResolveOutcome::NotFound => return Err(CoreError::NotFound),
        ResolveOutcome::Forbidden => return Err(CoreError::Forbidden),
        ResolveOutcome::AlreadyResolved => return Err(CoreError::AlreadyResolved),
    };

    router.deliver(
        &record.sender_id,
        Event::RequestResponse {
            request_id: record.id.clone(),
            status: record.status,
            user: responder.public(),
        },
    );
    info!(request = %request_id, by = %responder_id, status = ?record.status, "friend request resolved");
    Ok(record)
}

/// Pending requests awaiting `user_id`'s response, newest first.
pub fn list_pending(store: &Store, user_id: &str) -> Result<Vec<FriendRequestRecord>, CoreError> {
    Ok(store.list_pending(user_id)?)
}

/// Requests `user_id` has sent that are still unresolved, newest first.
pub fn list_sent(store: &Store, user_id: &str) -> Result<Vec<FriendRequestRecord>, CoreError> {
    Ok(store.list_sent(user_id)?)
}
