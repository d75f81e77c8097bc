//! Service-level error taxonomy and user-facing message mapping.

use remote::{AuthError, BlobError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field is missing. Fails fast, before any network call.
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    /// A selection referenced a user that no longer exists (stale picker).
    #[error("user not found")]
    UserNotFound,
    #[error("not signed in")]
    NotSignedIn,
    #[error("no active team")]
    NoActiveTeam,
}

impl ServiceError {
    /// Map the error to the message shown in the status slot. Recognized
    /// provider codes get specific messages; anything else falls back to
    /// the operation context with the underlying detail appended.
    pub fn user_message(&self, context: &str) -> String {
        match self {
            Self::Validation(msg) => (*msg).to_string(),
            Self::Auth(AuthError::DuplicateEmail) => "Email already registered".to_string(),
            Self::Auth(AuthError::WeakSecret) => {
                "Password too weak (minimum 6 characters)".to_string()
            }
            Self::Auth(AuthError::UnknownUser) => "User not found".to_string(),
            Self::Auth(AuthError::WrongSecret) => "Wrong password".to_string(),
            Self::UserNotFound => "User not found".to_string(),
            other => format!("{context}: {other}"),
        }
    }
}
