//! Identity provider interface.

use api_types::DocumentId;
use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::AuthError;

/// An authenticated identity as reported by the provider. The profile
/// document (username, avatar) lives in the document store, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: DocumentId,
    pub email: String,
}

/// Narrow interface to the authentication provider.
///
/// `identity_changes` fires on login, logout, token refresh and at startup
/// when a persisted session exists. The receiver is primed so the current
/// identity is delivered as the first change.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;

    fn identity_changes(&self) -> watch::Receiver<Option<Identity>>;
}
