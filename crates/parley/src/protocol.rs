use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum size of a JSON-lines frame (8 MiB).
/// Image payloads travel inline as base64, so frames can get large.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Typed enums for wire format safety
// ---------------------------------------------------------------------------

/// Lifecycle status of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request sent from a client to the server over its persistent connection.
///
/// `signup` and `login` bind the connection to an identity; every other
/// request fails with `unauthorized` until one of them succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    // -- Session --
    /// Create an account and bind this connection to it.
    Signup {
        full_name: String,
        email: String,
        password: String,
    },
    /// Log in to an existing account and bind this connection to it.
    Login { email: String, password: String },
    /// Get the caller's own public profile.
    Me,
    /// Replace the caller's profile picture (base64 payload).
    UpdateProfile { profile_pic: String },

    // -- Social graph --
    /// Look up a user by email (case-insensitive). Excludes the caller.
    SearchUser { email: String },
    /// List the caller's contacts.
    Contacts,
    /// Send a friend request to a user id.
    SendRequest { to: String },
    /// Accept or reject a friend request addressed to the caller.
    RespondRequest { request_id: String, accept: bool },
    /// Friend requests awaiting the caller's response, newest first.
    PendingRequests,
    /// Outstanding requests the caller has sent, newest first.
    SentRequests,

    // -- Messaging --
    /// Send a message to a contact. At least one of text/image is required;
    /// image is a base64 payload that is externalized before persistence.
    SendMessage {
        to: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        image: Option<String>,
    },
    /// Full message history between the caller and a peer, oldest first.
    MessagesWith { user_id: String },
    /// Distinct users the caller has exchanged messages with.
    ChatPartners,

    // -- Presence --
    /// Snapshot of currently online user ids.
    OnlineUsers,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A response sent from the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Connection established (sent once, before authentication).
    Hello { version: String },
    /// Request succeeded with optional data.
    Ok { data: Option<serde_json::Value> },
    /// Request failed.
    Error { code: String, message: String },
    /// Asynchronous event pushed to the connection.
    Event { event: Event },
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Asynchronous events pushed to live connections.
///
/// The `kind` tag and payload field names are the wire contract; clients
/// match on them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    /// A message addressed to this connection's identity was persisted.
    #[serde(rename = "newMessage")]
    NewMessage(MessageRecord),
    /// Summary notification for the same message (for badge/toast UIs).
    #[serde(rename = "messageNotification")]
    MessageNotification(MessageNotification),
    /// Someone sent this identity a friend request.
    #[serde(rename = "friendRequest")]
    FriendRequest {
        #[serde(rename = "requestId")]
        request_id: String,
        sender: UserPublic,
    },
    /// A friend request this identity sent was accepted or rejected.
    #[serde(rename = "requestResponse")]
    RequestResponse {
        #[serde(rename = "requestId")]
        request_id: String,
        status: RequestStatus,
        user: UserPublic,
    },
    /// Full set of online user ids, broadcast on every presence change.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers { online: Vec<String> },
}

// ---------------------------------------------------------------------------
// Record shapes returned in Ok.data and carried by events
// ---------------------------------------------------------------------------

/// A user's public profile (never carries the password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

/// A persisted message. Immutable once created; at least one of
/// `text`/`image` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Reference to the externalized image payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Milliseconds since the unix epoch.
    pub created_at: u64,
}

/// Summary payload for the `messageNotification` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageNotification {
    pub message_id: String,
    pub sender_id: String,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Whether the message carries an image.
    pub image: bool,
    pub timestamp: u64,
}

/// A friend request record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub status: RequestStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serde_round_trip() {
        let requests = vec![
            Request::Login {
                email: "a@example.com".to_string(),
                password: "hunter22".to_string(),
            },
            Request::SendRequest {
                to: "user-b".to_string(),
            },
            Request::RespondRequest {
                request_id: "req-1".to_string(),
                accept: true,
            },
            Request::SendMessage {
                to: "user-b".to_string(),
                text: Some("hello".to_string()),
                image: None,
            },
            Request::MessagesWith {
                user_id: "user-b".to_string(),
            },
            Request::OnlineUsers,
        ];

        for req in &requests {
            let json = serde_json::to_string(req).unwrap();
            let decoded: Request = serde_json::from_str(&json).unwrap();
            let json2 = serde_json::to_string(&decoded).unwrap();
            assert_eq!(json, json2);
        }
    }

    #[test]
    fn send_message_fields_default_to_none() {
        let req: Request =
            serde_json::from_str(r#"{"type":"send_message","to":"user-b"}"#).unwrap();
        match req {
            Request::SendMessage { to, text, image } => {
                assert_eq!(to, "user-b");
                assert!(text.is_none());
                assert!(image.is_none());
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn new_message_event_wire_shape() {
        let event = Event::NewMessage(MessageRecord {
            id: "m-1".to_string(),
            sender_id: "a".to_string(),
            receiver_id: "b".to_string(),
            text: Some("hi".to_string()),
            image: None,
            created_at: 1000,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"newMessage""#));
        assert!(json.contains(r#""_id":"m-1""#));
        assert!(json.contains(r#""senderId":"a""#));
        assert!(json.contains(r#""receiverId":"b""#));
        assert!(json.contains(r#""createdAt":1000"#));
        // Absent image must be absent on the wire, not null.
        assert!(!json.contains(r#""image""#));
    }

    #[test]
    fn friend_request_event_wire_shape() {
        let event = Event::FriendRequest {
            request_id: "req-1".to_string(),
            sender: UserPublic {
                id: "a".to_string(),
                full_name: "Alice Anders".to_string(),
                email: "alice@example.com".to_string(),
                profile_pic: None,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"friendRequest""#));
        assert!(json.contains(r#""requestId":"req-1""#));
        assert!(json.contains(r#""sender":{"#));
        assert!(json.contains(r#""fullName":"Alice Anders""#));
    }

    #[test]
    fn request_response_event_wire_shape() {
        let event = Event::RequestResponse {
            request_id: "req-1".to_string(),
            status: RequestStatus::Accepted,
            user: UserPublic {
                id: "b".to_string(),
                full_name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
                profile_pic: Some("/media/abc".to_string()),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"requestResponse""#));
        assert!(json.contains(r#""status":"accepted""#));
        assert!(json.contains(r#""profilePic":"/media/abc""#));
    }

    #[test]
    fn online_users_event_wire_shape() {
        let event = Event::OnlineUsers {
            online: vec!["a".to_string(), "b".to_string()],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"getOnlineUsers""#));
        assert!(json.contains(r#""online":["a","b"]"#));
    }

    #[test]
    fn event_round_trips_through_response() {
        let resp = Response::Event {
            event: Event::MessageNotification(MessageNotification {
                message_id: "m-1".to_string(),
                sender_id: "a".to_string(),
                sender_name: "Alice".to_string(),
                text: None,
                image: true,
                timestamp: 42,
            }),
        };
        let json = serde_json::to_string(&resp).unwrap();
        let decoded: Response = serde_json::from_str(&json).unwrap();
        match decoded {
            Response::Event {
                event: Event::MessageNotification(n),
            } => {
                assert_eq!(n.message_id, "m-1");
                assert!(n.image);
                assert!(n.text.is_none());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn request_status_parse_and_display() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<RequestStatus>().is_err());
    }
}
