pub mod auth;
pub mod chat;
pub mod social;

use crate::error::CoreError;
use crate::presence::PresenceRegistry;
use crate::router::EventRouter;
use parley::protocol::{Request, Response};
use parley_store::{MediaStore, Store};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

/// Shared server state accessible by all client connections.
pub struct ServerState {
    pub store: Store,
    pub presence: Arc<PresenceRegistry>,
    pub router: EventRouter,
    pub media: Arc<dyn MediaStore>,
}

impl ServerState {
    pub fn new(store: Store, media: Arc<dyn MediaStore>, max_connections: usize) -> Arc<Self> {
        let presence = Arc::new(PresenceRegistry::new(max_connections));
        let router = EventRouter::new(presence.clone());
        Arc::new(Self {
            store,
            presence,
            router,
            media,
        })
    }
}

/// Per-connection session. A connection starts unbound; signup/login bind
/// it to an identity and record the presence epoch for disconnect cleanup.
#[derive(Default)]
pub struct Session {
    pub user_id: Option<String>,
    pub presence_epoch: Option<u64>,
}

/// Handle a single request from a client. `conn` is this connection's event
/// sender, registered with the presence map when the session binds.
pub async fn handle_request(
    state: &Arc<ServerState>,
    session: &mut Session,
    conn: &mpsc::Sender<Response>,
    req: Request,
) -> Response {
    match req {
        // Session binding; the only requests allowed before authentication.
        Request::Signup {
            full_name,
            email,
            password,
        } => auth::handle_signup(state, session, conn, &full_name, &email, &password),
        Request::Login { email, password } => {
            auth::handle_login(state, session, conn, &email, &password)
        }

        req => {
            let Some(user_id) = session.user_id.clone() else {
                return error_response("unauthorized", "log in first");
            };
            match req {
                Request::Signup { .. } | Request::Login { .. } => unreachable!(),

                // Session / profile
                Request::Me => auth::handle_me(state, &user_id),
                Request::UpdateProfile { profile_pic } => {
                    auth::handle_update_profile(state, &user_id, &profile_pic)
                }

                // Social graph
                Request::SearchUser { email } => {
                    social::handle_search_user(state, &user_id, &email)
                }
                Request::Contacts => social::handle_contacts(state, &user_id),
                Request::SendRequest { to } => social::handle_send_request(state, &user_id, &to),
                Request::RespondRequest { request_id, accept } => {
                    social::handle_respond_request(state, &user_id, &request_id, accept)
                }
                Request::PendingRequests => social::handle_pending_requests(state, &user_id),
                Request::SentRequests => social::handle_sent_requests(state, &user_id),

                // Messaging
                Request::SendMessage { to, text, image } => {
                    chat::handle_send_message(state, &user_id, &to, text, image)
                }
                Request::MessagesWith { user_id: peer } => {
                    chat::handle_messages_with(state, &user_id, &peer)
                }
                Request::ChatPartners => chat::handle_chat_partners(state, &user_id),

                // Presence
                Request::OnlineUsers => social::handle_online_users(state),
            }
        }
    }
}

// ---- Shared helpers ----

pub fn ok_response(data: Option<serde_json::Value>) -> Response {
    Response::Ok { data }
}

pub fn error_response(code: &str, message: &str) -> Response {
    Response::Error {
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Map a domain error onto the wire. Storage failures get logged here since
/// their message is the only record of what went wrong.
pub fn core_error(err: CoreError) -> Response {
    if let CoreError::Storage(ref e) = err {
        error!(err = %e, "storage error");
    }
    error_response(err.code(), &err.to_string())
}
