//! In-memory identity provider.

use std::{collections::HashMap, sync::Mutex};

use api_types::DocumentId;
use async_trait::async_trait;
use remote::{AuthError, Identity, IdentityProvider};
use tokio::sync::watch;

/// Provider-enforced minimum secret length.
const MIN_PASSWORD_LEN: usize = 6;

pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    identity: watch::Sender<Option<Identity>>,
}

struct Account {
    uid: DocumentId,
    password: String,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            identity,
        }
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    /// Creates the account. Registration does not establish a session; the
    /// user signs in afterwards.
    async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if accounts.contains_key(email) {
            return Err(AuthError::DuplicateEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakSecret);
        }
        let uid = DocumentId::generate();
        accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        Ok(Identity {
            uid,
            email: email.to_string(),
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let account = accounts.get(email).ok_or(AuthError::UnknownUser)?;
        if account.password != password {
            return Err(AuthError::WrongSecret);
        }
        let identity = Identity {
            uid: account.uid.clone(),
            email: email.to_string(),
        };
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.identity.send_replace(None);
        Ok(())
    }

    fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
        let mut rx = self.identity.subscribe();
        // Deliver the current identity as the first change, covering the
        // persisted-session-at-startup case.
        rx.mark_changed();
        rx
    }
}
