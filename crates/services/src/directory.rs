//! Live directory of registered users, excluding the current identity.
//!
//! Selection source for the member picker. Re-filters on every push of the
//! user collection and on every identity change, so the self-exclusion
//! always tracks the session.

use std::sync::Arc;

use api_types::{DocumentId, UserProfile};
use remote::{DocumentStore, Subscription, shapes};
use tokio::{sync::watch, task::JoinHandle};

use crate::{live, session::CurrentUser};

pub struct DirectoryCache {
    users: watch::Receiver<Vec<UserProfile>>,
    worker: JoinHandle<()>,
}

impl DirectoryCache {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: watch::Receiver<Option<CurrentUser>>,
    ) -> Self {
        let (tx, users) = watch::channel(Vec::new());
        let subscription = live::subscribe_shape(store.as_ref(), &shapes::users_shape());
        let worker = tokio::spawn(run_worker(subscription, session, tx));
        Self { users, worker }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<UserProfile>> {
        let mut rx = self.users.clone();
        rx.mark_changed();
        rx
    }

    pub fn current(&self) -> Vec<UserProfile> {
        self.users.borrow().clone()
    }

    /// Look up a picker selection. Returns `None` for stale selections
    /// referencing users that no longer exist (or the current user).
    pub fn find(&self, user_id: &DocumentId) -> Option<UserProfile> {
        self.users
            .borrow()
            .iter()
            .find(|user| user.id == *user_id)
            .cloned()
    }
}

impl Drop for DirectoryCache {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker(
    mut users: Subscription,
    mut session: watch::Receiver<Option<CurrentUser>>,
    tx: watch::Sender<Vec<UserProfile>>,
) {
    loop {
        tokio::select! {
            res = users.changed() => {
                if res.is_err() {
                    break;
                }
            }
            res = session.changed() => {
                if res.is_err() {
                    break;
                }
            }
        }
        let exclude = session.borrow_and_update().as_ref().map(|u| u.id.clone());
        let snapshots = users.borrow_and_update().clone();
        let list: Vec<UserProfile> = live::decode_set(&snapshots)
            .into_iter()
            .filter(|user: &UserProfile| Some(&user.id) != exclude.as_ref())
            .collect();
        tx.send_replace(list);
    }
}
