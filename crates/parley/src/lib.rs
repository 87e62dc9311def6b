pub mod client;
pub mod protocol;

/// Default address the parley server listens on.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7400";
