use anyhow::{Context, Result, anyhow};
use parley::protocol::{FriendRequestRecord, MessageRecord, RequestStatus, UserPublic};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const DB_FILE: &str = "parley.db";

/// Result of [`Store::open_request`].
#[derive(Debug)]
pub enum RequestOutcome {
    /// A pending request now exists (freshly inserted or reopened).
    Opened(FriendRequestRecord),
    AlreadyContacts,
    DuplicatePending,
}

/// Result of [`Store::resolve_request`].
#[derive(Debug)]
pub enum ResolveOutcome {
    /// The request was pending and is now accepted or rejected.
    Resolved(FriendRequestRecord),
    NotFound,
    /// The request is not addressed to the responder.
    Forbidden,
    AlreadyResolved,
}

/// A user account row. The password hash never leaves this type;
/// everything wire-facing goes through [`User::public`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_pic: Option<String>,
    pub created_at_ms: u64,
}

impl User {
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            profile_pic: self.profile_pic.clone(),
        }
    }
}

/// SQLite-backed durable store for users, contacts, messages and friend
/// requests. One connection behind a `std::sync::Mutex`; reads and single-row
/// writes are one statement each, while the friend-request operations
/// ([`Store::open_request`], [`Store::resolve_request`]) run their checks and
/// writes in one transaction.
///
/// Holding every table in one database is what lets accepting a friend
/// request update the request status and both contact sets atomically.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database under the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let db_path = data_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        Self::init(conn)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("failed to open in-memory db")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON").ok();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY NOT NULL,
                full_name     TEXT NOT NULL,
                email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                profile_pic   TEXT,
                created_at_ms INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS contacts (
                user_id    TEXT NOT NULL REFERENCES users(id),
                contact_id TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (user_id, contact_id)
            );
            CREATE TABLE IF NOT EXISTS messages (
                id            TEXT PRIMARY KEY NOT NULL,
                sender_id     TEXT NOT NULL REFERENCES users(id),
                receiver_id   TEXT NOT NULL REFERENCES users(id),
                text          TEXT,
                image         TEXT,
                created_at_ms INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_pair
                ON messages(sender_id, receiver_id);
            CREATE TABLE IF NOT EXISTS friend_requests (
                id            TEXT PRIMARY KEY NOT NULL,
                sender_id     TEXT NOT NULL REFERENCES users(id),
                receiver_id   TEXT NOT NULL REFERENCES users(id),
                status        TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                updated_at_ms INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_requests_receiver
                ON friend_requests(receiver_id, status);",
        )
        .context("failed to create schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("store lock poisoned"))
    }

    // -- Users ---------------------------------------------------------------

    /// Create a user. Returns `None` if the email is already taken
    /// (case-insensitive).
    pub fn create_user(&self, user: &User) -> Result<Option<()>> {
        let conn = self.lock()?;
        let taken: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                [&user.email],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Ok(None);
        }
        conn.execute(
            "INSERT INTO users (id, full_name, email, password_hash, profile_pic, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.full_name,
                user.email,
                user.password_hash,
                user.profile_pic,
                user.created_at_ms as i64,
            ],
        )?;
        Ok(Some(()))
    }

    pub fn find_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, full_name, email, password_hash, profile_pic, created_at_ms
                 FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()?)
    }

    /// Case-insensitive email lookup (the email column collates NOCASE).
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, full_name, email, password_hash, profile_pic, created_at_ms
                 FROM users WHERE email = ?1",
                [email],
                user_from_row,
            )
            .optional()?)
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let found: Option<String> = conn
            .query_row("SELECT id FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Replace a user's profile picture reference. Returns false if the
    /// user does not exist.
    pub fn update_profile_pic(&self, id: &str, profile_pic: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET profile_pic = ?2 WHERE id = ?1",
            params![id, profile_pic],
        )?;
        Ok(changed > 0)
    }

    // -- Contacts ------------------------------------------------------------

    /// Whether `contact_id` is in `user_id`'s contact set.
    pub fn are_contacts(&self, user_id: &str, contact_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let found: Option<String> = conn
            .query_row(
                "SELECT contact_id FROM contacts WHERE user_id = ?1 AND contact_id = ?2",
                params![user_id, contact_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// A user's contacts, sorted by display name.
    pub fn contacts_of(&self, user_id: &str) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.full_name, u.email, u.password_hash, u.profile_pic, u.created_at_ms
             FROM contacts c JOIN users u ON u.id = c.contact_id
             WHERE c.user_id = ?1
             ORDER BY u.full_name COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([user_id], user_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // -- Messages ------------------------------------------------------------

    pub fn insert_message(&self, msg: &MessageRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (id, sender_id, receiver_id, text, image, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                msg.id,
                msg.sender_id,
                msg.receiver_id,
                msg.text,
                msg.image,
                msg.created_at as i64,
            ],
        )?;
        Ok(())
    }

    /// All messages between two users, oldest first.
    pub fn messages_between(&self, a: &str, b: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, receiver_id, text, image, created_at_ms
             FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY created_at_ms, rowid",
        )?;
        let rows = stmt.query_map(params![a, b], message_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Distinct users this user has exchanged messages with.
    pub fn chat_partners_of(&self, user_id: &str) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.full_name, u.email, u.password_hash, u.profile_pic, u.created_at_ms
             FROM users u
             WHERE u.id IN (
                 SELECT CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END
                 FROM messages m
                 WHERE m.sender_id = ?1 OR m.receiver_id = ?1
             )
             ORDER BY u.full_name COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([user_id], user_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // -- Friend requests -----------------------------------------------------

    pub fn find_request(&self, id: &str) -> Result<Option<FriendRequestRecord>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, sender_id, receiver_id, status, created_at_ms, updated_at_ms
                 FROM friend_requests WHERE id = ?1",
                [id],
                request_from_row,
            )
            .optional()?)
    }

    /// Open a friend request from `sender_id` to `receiver_id`.
    ///
    /// The pair checks and the write run in one transaction, so two
    /// concurrent opens for the same pair (in either direction) can never
    /// both land: at most one request between a pair is ever pending. A
    /// rejected request between the pair is reopened under its original id
    /// with the direction reassigned, instead of inserting a duplicate.
    pub fn open_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
        now_ms: u64,
    ) -> Result<RequestOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let contacts: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM contacts WHERE user_id = ?1 AND contact_id = ?2",
                params![sender_id, receiver_id],
                |row| row.get(0),
            )
            .optional()?;
        if contacts.is_some() {
            return Ok(RequestOutcome::AlreadyContacts);
        }

        let existing = tx
            .query_row(
                "SELECT id, sender_id, receiver_id, status, created_at_ms, updated_at_ms
                 FROM friend_requests
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY updated_at_ms DESC, rowid DESC
                 LIMIT 1",
                params![sender_id, receiver_id],
                request_from_row,
            )
            .optional()?;

        let record = match existing {
            Some(req) if req.status == RequestStatus::Pending => {
                return Ok(RequestOutcome::DuplicatePending);
            }
            Some(req) if req.status == RequestStatus::Accepted => {
                return Ok(RequestOutcome::AlreadyContacts);
            }
            Some(rejected) => {
                tx.execute(
                    "UPDATE friend_requests
                     SET status = 'pending', sender_id = ?2, receiver_id = ?3, updated_at_ms = ?4
                     WHERE id = ?1",
                    params![rejected.id, sender_id, receiver_id, now_ms as i64],
                )?;
                FriendRequestRecord {
                    id: rejected.id,
                    sender_id: sender_id.to_string(),
                    receiver_id: receiver_id.to_string(),
                    status: RequestStatus::Pending,
                    created_at: rejected.created_at,
                    updated_at: now_ms,
                }
            }
            None => {
                let record = FriendRequestRecord {
                    id: Uuid::new_v4().to_string(),
                    sender_id: sender_id.to_string(),
                    receiver_id: receiver_id.to_string(),
                    status: RequestStatus::Pending,
                    created_at: now_ms,
                    updated_at: now_ms,
                };
                tx.execute(
                    "INSERT INTO friend_requests
                         (id, sender_id, receiver_id, status, created_at_ms, updated_at_ms)
                     VALUES (?1, ?2, ?3, 'pending', ?4, ?4)",
                    params![record.id, record.sender_id, record.receiver_id, now_ms as i64],
                )?;
                record
            }
        };

        tx.commit()?;
        Ok(RequestOutcome::Opened(record))
    }

    /// Resolve a pending request as `responder_id`, accepting or rejecting it.
    ///
    /// The pending-status check and the writes share one transaction, so a
    /// request resolves exactly once even under concurrent responders, and
    /// accepting can never commit without both contact rows.
    pub fn resolve_request(
        &self,
        id: &str,
        responder_id: &str,
        accept: bool,
        now_ms: u64,
    ) -> Result<ResolveOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(request) = tx
            .query_row(
                "SELECT id, sender_id, receiver_id, status, created_at_ms, updated_at_ms
                 FROM friend_requests WHERE id = ?1",
                [id],
                request_from_row,
            )
            .optional()?
        else {
            return Ok(ResolveOutcome::NotFound);
        };
        if request.receiver_id != responder_id {
            return Ok(ResolveOutcome::Forbidden);
        }
        if request.status != RequestStatus::Pending {
            return Ok(ResolveOutcome::AlreadyResolved);
        }

        let status = if accept {
            RequestStatus::Accepted
        } else {
            RequestStatus::Rejected
        };
        tx.execute(
            "UPDATE friend_requests SET status = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_ms as i64],
        )?;
        if accept {
            tx.execute(
                "INSERT OR IGNORE INTO contacts (user_id, contact_id) VALUES (?1, ?2), (?2, ?1)",
                params![request.sender_id, request.receiver_id],
            )?;
        }
        tx.commit()?;

        Ok(ResolveOutcome::Resolved(FriendRequestRecord {
            status,
            updated_at: now_ms,
            ..request
        }))
    }

    /// Pending requests addressed to a user, newest first.
    pub fn list_pending(&self, user_id: &str) -> Result<Vec<FriendRequestRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, receiver_id, status, created_at_ms, updated_at_ms
             FROM friend_requests
             WHERE receiver_id = ?1 AND status = 'pending'
             ORDER BY created_at_ms DESC, rowid DESC",
        )?;
        let rows = stmt.query_map([user_id], request_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Outstanding (still pending) requests a user has sent, newest first.
    pub fn list_sent(&self, user_id: &str) -> Result<Vec<FriendRequestRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, receiver_id, status, created_at_ms, updated_at_ms
             FROM friend_requests
             WHERE sender_id = ?1 AND status = 'pending'
             ORDER BY created_at_ms DESC, rowid DESC",
        )?;
        let rows = stmt.query_map([user_id], request_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        profile_pic: row.get(4)?,
        created_at_ms: row.get::<_, i64>(5)? as u64,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        text: row.get(3)?,
        image: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<FriendRequestRecord> {
    let status: String = row.get(3)?;
    let status = status.parse::<RequestStatus>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(3, "status".to_string(), rusqlite::types::Type::Text)
    })?;
    Ok(FriendRequestRecord {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        status,
        created_at: row.get::<_, i64>(4)? as u64,
        updated_at: row.get::<_, i64>(5)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_user(name: &str, email: &str) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            full_name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            profile_pic: None,
            created_at_ms: 1000,
        }
    }

    fn open(store: &Store, sender: &str, receiver: &str, at: u64) -> FriendRequestRecord {
        match store.open_request(sender, receiver, at).unwrap() {
            RequestOutcome::Opened(record) => record,
            other => panic!("expected Opened, got {other:?}"),
        }
    }

    fn resolve(store: &Store, id: &str, responder: &str, accept: bool, at: u64) -> FriendRequestRecord {
        match store.resolve_request(id, responder, accept, at).unwrap() {
            ResolveOutcome::Resolved(record) => record,
            other => panic!("expected Resolved, got {other:?}"),
        }
    }

    fn store_with_users() -> (Store, User, User) {
        let store = Store::open_in_memory().unwrap();
        let alice = make_user("Alice", "alice@example.com");
        let bob = make_user("Bob", "bob@example.com");
        store.create_user(&alice).unwrap().unwrap();
        store.create_user(&bob).unwrap().unwrap();
        (store, alice, bob)
    }

    #[test]
    fn create_and_find_user() {
        let (store, alice, _) = store_with_users();
        let found = store.find_user(&alice.id).unwrap().unwrap();
        assert_eq!(found.email, "alice@example.com");
        assert!(store.user_exists(&alice.id).unwrap());
        assert!(!store.user_exists("nope").unwrap());
    }

    #[test]
    fn email_unique_case_insensitive() {
        let (store, _, _) = store_with_users();
        let dup = make_user("Alice Two", "ALICE@example.com");
        assert!(store.create_user(&dup).unwrap().is_none());

        let found = store.find_user_by_email("Alice@Example.COM").unwrap();
        assert_eq!(found.unwrap().full_name, "Alice");
    }

    #[test]
    fn update_profile_pic() {
        let (store, alice, _) = store_with_users();
        assert!(store.update_profile_pic(&alice.id, "/media/x").unwrap());
        let found = store.find_user(&alice.id).unwrap().unwrap();
        assert_eq!(found.profile_pic.as_deref(), Some("/media/x"));
        assert!(!store.update_profile_pic("nope", "/media/x").unwrap());
    }

    #[test]
    fn accept_makes_contacts_mutual() {
        let (store, alice, bob) = store_with_users();
        let request = open(&store, &alice.id, &bob.id, 1000);
        let resolved = resolve(&store, &request.id, &bob.id, true, 2000);
        assert_eq!(resolved.status, RequestStatus::Accepted);
        assert_eq!(resolved.updated_at, 2000);

        assert!(store.are_contacts(&alice.id, &bob.id).unwrap());
        assert!(store.are_contacts(&bob.id, &alice.id).unwrap());

        let req = store.find_request(&request.id).unwrap().unwrap();
        assert_eq!(req.status, RequestStatus::Accepted);

        let contacts = store.contacts_of(&alice.id).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, bob.id);

        // Contacts cannot open a new request in either direction.
        assert!(matches!(
            store.open_request(&alice.id, &bob.id, 3000).unwrap(),
            RequestOutcome::AlreadyContacts
        ));
        assert!(matches!(
            store.open_request(&bob.id, &alice.id, 3000).unwrap(),
            RequestOutcome::AlreadyContacts
        ));
    }

    #[test]
    fn second_open_for_pair_yields_single_pending_row() {
        let (store, alice, bob) = store_with_users();
        let request = open(&store, &alice.id, &bob.id, 1000);

        // Re-sends in both directions refuse while one is pending.
        assert!(matches!(
            store.open_request(&alice.id, &bob.id, 2000).unwrap(),
            RequestOutcome::DuplicatePending
        ));
        assert!(matches!(
            store.open_request(&bob.id, &alice.id, 2000).unwrap(),
            RequestOutcome::DuplicatePending
        ));

        // Exactly one pending row exists for the pair.
        let pending = store.list_pending(&bob.id).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, request.id);
        assert!(store.list_pending(&alice.id).unwrap().is_empty());
    }

    #[test]
    fn request_resolves_exactly_once() {
        let (store, alice, bob) = store_with_users();
        let request = open(&store, &alice.id, &bob.id, 1000);
        resolve(&store, &request.id, &bob.id, true, 2000);

        // A second resolution, even with the opposite outcome, is refused
        // and cannot disturb the committed state.
        assert!(matches!(
            store
                .resolve_request(&request.id, &bob.id, false, 3000)
                .unwrap(),
            ResolveOutcome::AlreadyResolved
        ));
        let req = store.find_request(&request.id).unwrap().unwrap();
        assert_eq!(req.status, RequestStatus::Accepted);
        assert!(store.are_contacts(&alice.id, &bob.id).unwrap());
    }

    #[test]
    fn resolve_checks_receiver_and_existence() {
        let (store, alice, bob) = store_with_users();
        let request = open(&store, &alice.id, &bob.id, 1000);

        assert!(matches!(
            store.resolve_request("missing", &bob.id, true, 2000).unwrap(),
            ResolveOutcome::NotFound
        ));
        // The sender cannot resolve their own request.
        assert!(matches!(
            store
                .resolve_request(&request.id, &alice.id, true, 2000)
                .unwrap(),
            ResolveOutcome::Forbidden
        ));
        let req = store.find_request(&request.id).unwrap().unwrap();
        assert_eq!(req.status, RequestStatus::Pending);
    }

    #[test]
    fn reopen_rejected_request_reassigns_direction() {
        let (store, alice, bob) = store_with_users();
        let request = open(&store, &alice.id, &bob.id, 1000);
        resolve(&store, &request.id, &bob.id, false, 1500);
        assert!(store.list_pending(&bob.id).unwrap().is_empty());

        // Bob re-sends: same record, flipped direction.
        let reopened = open(&store, &bob.id, &alice.id, 2000);
        assert_eq!(reopened.id, request.id);
        assert_eq!(reopened.created_at, 1000);

        let req = store.find_request(&request.id).unwrap().unwrap();
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.sender_id, bob.id);
        assert_eq!(req.receiver_id, alice.id);
    }

    #[test]
    fn list_pending_and_sent_newest_first() {
        let (store, alice, bob) = store_with_users();
        let carol = make_user("Carol", "carol@example.com");
        store.create_user(&carol).unwrap().unwrap();

        let r1 = open(&store, &alice.id, &bob.id, 1000);
        let r2 = open(&store, &carol.id, &bob.id, 2000);

        let pending = store.list_pending(&bob.id).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, r2.id);
        assert_eq!(pending[1].id, r1.id);

        let sent = store.list_sent(&alice.id).unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, r1.id);

        // Resolved requests drop out of both lists.
        resolve(&store, &r1.id, &bob.id, false, 3000);
        assert_eq!(store.list_pending(&bob.id).unwrap().len(), 1);
        assert!(store.list_sent(&alice.id).unwrap().is_empty());
    }

    #[test]
    fn messages_between_ordered_both_directions() {
        let (store, alice, bob) = store_with_users();
        for (i, (from, to)) in [(&alice, &bob), (&bob, &alice), (&alice, &bob)]
            .iter()
            .enumerate()
        {
            store
                .insert_message(&MessageRecord {
                    id: format!("m{i}"),
                    sender_id: from.id.clone(),
                    receiver_id: to.id.clone(),
                    text: Some(format!("msg {i}")),
                    image: None,
                    created_at: 1000 + i as u64,
                })
                .unwrap();
        }

        let history = store.messages_between(&alice.id, &bob.id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, "m0");
        assert_eq!(history[2].id, "m2");

        // Same history regardless of argument order.
        let reversed = store.messages_between(&bob.id, &alice.id).unwrap();
        assert_eq!(history, reversed);
    }

    #[test]
    fn image_only_message_round_trips() {
        let (store, alice, bob) = store_with_users();
        store
            .insert_message(&MessageRecord {
                id: "m1".to_string(),
                sender_id: alice.id.clone(),
                receiver_id: bob.id.clone(),
                text: None,
                image: Some("/media/pic".to_string()),
                created_at: 1000,
            })
            .unwrap();

        let history = store.messages_between(&alice.id, &bob.id).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].text.is_none());
        assert_eq!(history[0].image.as_deref(), Some("/media/pic"));
    }

    #[test]
    fn chat_partners_deduplicated() {
        let (store, alice, bob) = store_with_users();
        let carol = make_user("Carol", "carol@example.com");
        store.create_user(&carol).unwrap().unwrap();

        for (i, (from, to)) in [(&alice, &bob), (&bob, &alice), (&carol, &alice)]
            .iter()
            .enumerate()
        {
            store
                .insert_message(&MessageRecord {
                    id: format!("m{i}"),
                    sender_id: from.id.clone(),
                    receiver_id: to.id.clone(),
                    text: Some("hi".to_string()),
                    image: None,
                    created_at: 1000 + i as u64,
                })
                .unwrap();
        }

        let partners = store.chat_partners_of(&alice.id).unwrap();
        let ids: Vec<&str> = partners.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(partners.len(), 2);
        assert!(ids.contains(&bob.id.as_str()));
        assert!(ids.contains(&carol.id.as_str()));
    }

    #[test]
    fn persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let alice = make_user("Alice", "alice@example.com");
        {
            let store = Store::open(dir.path()).unwrap();
            store.create_user(&alice).unwrap().unwrap();
        }
        let store = Store::open(dir.path()).unwrap();
        let found = store.find_user(&alice.id).unwrap().unwrap();
        assert_eq!(found.full_name, "Alice");
    }
}
