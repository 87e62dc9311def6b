pub mod error;
pub mod handler;
pub mod messaging;
pub mod presence;
pub mod relationship;
pub mod router;
pub mod server;

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
