use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::io;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("invalid media payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Sink for inline base64 image payloads. Implementations persist the
/// decoded bytes and return an opaque reference that is stored in place
/// of the payload.
pub trait MediaStore: Send + Sync {
    fn upload(&self, base64_payload: &str) -> Result<String, MediaError>;
}

/// Media store writing decoded payloads to a local directory.
pub struct LocalMediaStore {
    dir: PathBuf,
}

impl LocalMediaStore {
    pub fn new(dir: PathBuf) -> Result<Self, MediaError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl MediaStore for LocalMediaStore {
    fn upload(&self, base64_payload: &str) -> Result<String, MediaError> {
        // Accept both raw base64 and data URLs ("data:image/png;base64,...").
        let encoded = match base64_payload.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => base64_payload,
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| MediaError::InvalidPayload(e.to_string()))?;
        if bytes.is_empty() {
            return Err(MediaError::InvalidPayload("empty payload".to_string()));
        }

        let name = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("{name}.bin"));
        std::fs::write(&path, &bytes)?;
        debug!(path = %path.display(), size = bytes.len(), "stored media");
        Ok(format!("/media/{name}"))
    }
}
