//! Error types for the external collaborators.
//!
//! Provider failure codes are modeled as closed enumerations with a
//! fallback variant carrying the raw message, so callers match on kinds
//! instead of strings.

use thiserror::Error;

/// Failures reported by the identity provider.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("email already in use")]
    DuplicateEmail,
    #[error("password too weak")]
    WeakSecret,
    #[error("user not found")]
    UnknownUser,
    #[error("wrong password")]
    WrongSecret,
    /// Any provider failure without a recognized code.
    #[error("{0}")]
    Provider(String),
}

/// Failures reported by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to decode document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures reported by the blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("could not resolve retrieval url: {0}")]
    Resolve(String),
}
