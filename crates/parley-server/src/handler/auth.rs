use super::{ServerState, Session, error_response, ok_response};
use crate::now_ms;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use parley::protocol::Response;
use parley_store::User;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

pub fn handle_signup(
    state: &Arc<ServerState>,
    session: &mut Session,
    conn: &mpsc::Sender<Response>,
    full_name: &str,
    email: &str,
    password: &str,
) -> Response {
    if session.user_id.is_some() {
        return error_response("already_authenticated", "connection is already bound");
    }
    let full_name = full_name.trim();
    let email = email.trim();
    if full_name.is_empty() || email.is_empty() || !email.contains('@') {
        return error_response("invalid_request", "full name and a valid email are required");
    }
    if password.len() < MIN_PASSWORD_LEN {
        return error_response(
            "invalid_request",
            "password must be at least 6 characters",
        );
    }

    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(err = %e, "password hashing failed");
            return error_response("storage", "failed to create account");
        }
    };

    let user = User {
        id: Uuid::new_v4().to_string(),
        full_name: full_name.to_string(),
        email: email.to_string(),
        password_hash,
        profile_pic: None,
        created_at_ms: now_ms(),
    };
    match state.store.create_user(&user) {
        Ok(Some(())) => {}
        Ok(None) => return error_response("email_taken", "an account with this email exists"),
        Err(e) => {
            error!(err = %e, "signup failed");
            return error_response("storage", "failed to create account");
        }
    }

    info!(user = %user.id, email = %user.email, "account created");
    bind(state, session, conn, &user.id)
        .unwrap_or_else(|| ok_response(serde_json::to_value(user.public()).ok()))
}

pub fn handle_login(
    state: &Arc<ServerState>,
    session: &mut Session,
    conn: &mpsc::Sender<Response>,
    email: &str,
    password: &str,
) -> Response {
    if session.user_id.is_some() {
        return error_response("already_authenticated", "connection is already bound");
    }

    let user = match state.store.find_user_by_email(email.trim()) {
        Ok(Some(user)) => user,
        Ok(None) => return error_response("invalid_credentials", "wrong email or password"),
        Err(e) => {
            error!(err = %e, "login lookup failed");
            return error_response("storage", "failed to log in");
        }
    };
    if !verify_password(password, &user.password_hash) {
        return error_response("invalid_credentials", "wrong email or password");
    }

    info!(user = %user.id, "logged in");
    bind(state, session, conn, &user.id)
        .unwrap_or_else(|| ok_response(serde_json::to_value(user.public()).ok()))
}

pub fn handle_me(state: &Arc<ServerState>, user_id: &str) -> Response {
    match state.store.find_user(user_id) {
        Ok(Some(user)) => ok_response(serde_json::to_value(user.public()).ok()),
        Ok(None) => error_response("not_found", "account no longer exists"),
        Err(e) => {
            error!(err = %e, "profile lookup failed");
            error_response("storage", "failed to load profile")
        }
    }
}

pub fn handle_update_profile(
    state: &Arc<ServerState>,
    user_id: &str,
    profile_pic: &str,
) -> Response {
    let reference = match state.media.upload(profile_pic) {
        Ok(reference) => reference,
        Err(e) => return error_response("image_upload_failed", &e.to_string()),
    };
    match state.store.update_profile_pic(user_id, &reference) {
        Ok(true) => handle_me(state, user_id),
        Ok(false) => error_response("not_found", "account no longer exists"),
        Err(e) => {
            error!(err = %e, "profile update failed");
            error_response("storage", "failed to update profile")
        }
    }
}

/// Bind the connection to an identity and register it for events.
/// Returns `Some(error)` if the presence map is at capacity.
fn bind(
    state: &Arc<ServerState>,
    session: &mut Session,
    conn: &mpsc::Sender<Response>,
    user_id: &str,
) -> Option<Response> {
    match state.presence.register(user_id, conn.clone()) {
        Some(epoch) => {
            session.user_id = Some(user_id.to_string());
            session.presence_epoch = Some(epoch);
            None
        }
        None => Some(error_response("at_capacity", "server is at capacity")),
    }
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
