//! Session manager: the authenticated identity and its profile overlay.
//!
//! A worker follows the provider's identity changes. Each non-null identity
//! opens a live observation of that user's profile document and overlays
//! the username once it resolves; a null identity pushes `None`, which is
//! the single teardown trigger for everything downstream.

use std::sync::Arc;

use api_types::{DocumentId, UserProfile};
use remote::{
    DocSubscription, DocumentStore, Identity, IdentityProvider, server_timestamp, shapes,
};
use serde_json::json;
use tokio::{sync::watch, task::JoinHandle};

use crate::{error::ServiceError, live::fields_of};

/// The signed-in user as seen by the rest of the system. `username` is
/// absent until the profile subscription delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: DocumentId,
    pub email: String,
    pub username: Option<String>,
}

impl CurrentUser {
    /// Username once resolved, email until then.
    pub fn display_name(&self) -> &str {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    current: watch::Receiver<Option<CurrentUser>>,
    worker: JoinHandle<()>,
}

impl SessionManager {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let (tx, current) = watch::channel(None);
        let worker = tokio::spawn(run_worker(
            identity.identity_changes(),
            store.clone(),
            tx,
        ));
        Self {
            identity,
            store,
            current,
            worker,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CurrentUser>> {
        let mut rx = self.current.clone();
        rx.mark_changed();
        rx
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Create the auth identity, then write the matching profile document.
    /// The two steps are not atomic: a failed profile write leaves the
    /// identity behind with no profile, surfaced only as the write's error.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<(), ServiceError> {
        if email.is_empty() || password.is_empty() || username.is_empty() {
            return Err(ServiceError::Validation("Fill in all fields"));
        }
        let identity = self.identity.register(email, password).await?;
        let profile = fields_of(json!({
            "uid": identity.uid,
            "username": username,
            "email": email,
            "createdAt": server_timestamp(),
            "avatar": null,
        }));
        self.store
            .set(&shapes::users_path(), &identity.uid, profile)
            .await?;
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ServiceError> {
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::Validation("Enter email and password"));
        }
        self.identity.login(email, password).await?;
        Ok(())
    }

    /// Delegates to the provider; the resulting `None` identity push clears
    /// team context and task store downstream.
    pub async fn logout(&self) -> Result<(), ServiceError> {
        self.identity.logout().await?;
        Ok(())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker(
    mut identities: watch::Receiver<Option<Identity>>,
    store: Arc<dyn DocumentStore>,
    tx: watch::Sender<Option<CurrentUser>>,
) {
    let mut profile: Option<DocSubscription> = None;
    loop {
        tokio::select! {
            changed = identities.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = identities.borrow_and_update().clone();
                match next {
                    Some(identity) => {
                        tracing::debug!(uid = %identity.uid, "identity established");
                        profile = Some(store.observe(&shapes::users_path(), &identity.uid));
                        tx.send_replace(Some(CurrentUser {
                            id: identity.uid,
                            email: identity.email,
                            username: None,
                        }));
                    }
                    None => {
                        tracing::debug!("identity cleared");
                        profile = None;
                        tx.send_replace(None);
                    }
                }
            }
            res = wait_profile(&mut profile) => {
                match res {
                    Ok(()) => {
                        let username = profile
                            .as_mut()
                            .and_then(|rx| rx.borrow_and_update().clone())
                            .and_then(|snapshot| match snapshot.deserialize::<UserProfile>() {
                                Ok(p) => Some(p.username),
                                Err(err) => {
                                    tracing::warn!(%err, "skipping undecodable profile");
                                    None
                                }
                            });
                        tx.send_if_modified(|current| match current {
                            Some(user) if user.username != username => {
                                user.username = username;
                                true
                            }
                            _ => false,
                        });
                    }
                    Err(_) => {
                        profile = None;
                    }
                }
            }
        }
    }
}

/// Await the next profile push, or park forever while no profile
/// observation is open.
async fn wait_profile(profile: &mut Option<DocSubscription>) -> Result<(), watch::error::RecvError> {
    match profile.as_mut() {
        Some(rx) => rx.changed().await,
        None => std::future::pending().await,
    }
}
