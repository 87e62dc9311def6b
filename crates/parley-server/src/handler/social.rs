use super::{ServerState, core_error, error_response, ok_response};
use crate::relationship;
use parley::protocol::{Response, UserPublic};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

pub fn handle_search_user(state: &Arc<ServerState>, user_id: &str, email: &str) -> Response {
    match state.store.find_user_by_email(email.trim()) {
        Ok(Some(user)) if user.id != user_id => {
            ok_response(serde_json::to_value(user.public()).ok())
        }
        Ok(_) => error_response("not_found", "no user with that email"),
        Err(e) => {
            error!(err = %e, "user search failed");
            error_response("storage", "search failed")
        }
    }
}

pub fn handle_contacts(state: &Arc<ServerState>, user_id: &str) -> Response {
    match state.store.contacts_of(user_id) {
        Ok(contacts) => {
            let contacts: Vec<UserPublic> = contacts.iter().map(|u| u.public()).collect();
            ok_response(serde_json::to_value(contacts).ok())
        }
        Err(e) => {
            error!(err = %e, "contacts lookup failed");
            error_response("storage", "failed to load contacts")
        }
    }
}

pub fn handle_send_request(state: &Arc<ServerState>, user_id: &str, to: &str) -> Response {
    match relationship::send_request(&state.store, &state.router, user_id, to) {
        Ok(record) => ok_response(serde_json::to_value(record).ok()),
        Err(e) => core_error(e),
    }
}

pub fn handle_respond_request(
    state: &Arc<ServerState>,
    user_id: &str,
    request_id: &str,
    accept: bool,
) -> Response {
    match relationship::respond(&state.store, &state.router, request_id, user_id, accept) {
        Ok(record) => ok_response(serde_json::to_value(record).ok()),
        Err(e) => core_error(e),
    }
}

pub fn handle_pending_requests(state: &Arc<ServerState>, user_id: &str) -> Response {
    match relationship::list_pending(&state.store, user_id) {
        Ok(requests) => ok_response(serde_json::to_value(requests).ok()),
        Err(e) => core_error(e),
    }
}

pub fn handle_sent_requests(state: &Arc<ServerState>, user_id: &str) -> Response {
    match relationship::list_sent(&state.store, user_id) {
        Ok(requests) => ok_response(serde_json::to_value(requests).ok()),
        Err(e) => core_error(e),
    }
}

pub fn handle_online_users(state: &Arc<ServerState>) -> Response {
    ok_response(Some(json!({ "online": state.presence.online_ids() })))
}
