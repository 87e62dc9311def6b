/// Domain errors for the social graph and messaging paths.
///
/// Each variant maps to a stable wire code via [`CoreError::code`]; the
/// `Display` text becomes the error message on the wire.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("cannot send a friend request to yourself")]
    SelfRequest,
    #[error("cannot send a message to yourself")]
    SelfMessage,
    #[error("message needs text or an image")]
    EmptyMessage,
    #[error("no such user")]
    UnknownReceiver,
    #[error("already contacts with this user")]
    AlreadyContacts,
    #[error("a request between these users is already pending")]
    DuplicatePending,
    #[error("request not found")]
    NotFound,
    #[error("account no longer exists")]
    AccountGone,
    #[error("this request is not addressed to you")]
    Forbidden,
    #[error("this request has already been resolved")]
    AlreadyResolved,
    #[error("you are not contacts with this user")]
    NotContacts,
    #[error("image upload failed: {0}")]
    ImageUploadFailed(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::SelfRequest => "self_request",
            CoreError::SelfMessage => "self_message",
            CoreError::EmptyMessage => "empty_message",
            CoreError::UnknownReceiver => "unknown_receiver",
            CoreError::AlreadyContacts => "already_contacts",
            CoreError::DuplicatePending => "duplicate_pending",
            CoreError::NotFound => "not_found",
            CoreError::AccountGone => "not_found",
            CoreError::Forbidden => "forbidden",
            CoreError::AlreadyResolved => "already_resolved",
            CoreError::NotContacts => "not_contacts",
            CoreError::ImageUploadFailed(_) => "image_upload_failed",
            CoreError::Storage(_) => "storage",
        }
    }
}
