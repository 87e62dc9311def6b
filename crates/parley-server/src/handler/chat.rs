use super::{ServerState, core_error, error_response, ok_response};
use crate::messaging;
use parley::protocol::{Response, UserPublic};
use std::sync::Arc;
use tracing::error;

pub fn handle_send_message(
    state: &Arc<ServerState>,
    user_id: &str,
    to: &str,
    text: Option<String>,
    image: Option<String>,
) -> Response {
    let sender = match state.store.find_user(user_id) {
        Ok(Some(user)) => user,
        Ok(None) => return error_response("not_found", "account no longer exists"),
        Err(e) => {
            error!(err = %e, "sender lookup failed");
            return error_response("storage", "failed to send message");
        }
    };
    match messaging::send_message(
        &state.store,
        &state.router,
        state.media.as_ref(),
        &sender,
        to,
        text,
        image,
    ) {
        Ok(record) => ok_response(serde_json::to_value(record).ok()),
        Err(e) => core_error(e),
    }
}

pub fn handle_messages_with(state: &Arc<ServerState>, user_id: &str, peer_id: &str) -> Response {
    match messaging::messages_with(&state.store, user_id, peer_id) {
        Ok(history) => ok_response(serde_json::to_value(history).ok()),
        Err(e) => core_error(e),
    }
}

pub fn handle_chat_partners(state: &Arc<ServerState>, user_id: &str) -> Response {
    match messaging::chat_partners(&state.store, user_id) {
        Ok(partners) => {
            let partners: Vec<UserPublic> = partners.iter().map(|u| u.public()).collect();
            ok_response(serde_json::to_value(partners).ok())
        }
        Err(e) => core_error(e),
    }
}
