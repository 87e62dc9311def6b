pub mod media;
pub mod store;

pub use media::{LocalMediaStore, MediaError, MediaStore};
pub use store::{RequestOutcome, ResolveOutcome, Store, User};
