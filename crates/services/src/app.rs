//! Component wiring over the three collaborator interfaces.
//!
//! Construction order follows the data flow: session feeds directory and
//! team context, the active team feeds the task store, and every user
//! intent goes through the mutation coordinator.

use std::sync::Arc;

use remote::{BlobStore, DocumentStore, IdentityProvider};
use tokio::sync::watch;

use crate::{
    directory::DirectoryCache,
    mutations::{Confirm, MutationCoordinator},
    projector::{Projection, TaskFilter, project},
    session::SessionManager,
    status::{Status, StatusSlot},
    tasks::TaskStore,
    team::TeamContext,
};

pub struct App {
    pub session: Arc<SessionManager>,
    pub directory: Arc<DirectoryCache>,
    pub team: Arc<TeamContext>,
    pub tasks: TaskStore,
    pub mutations: MutationCoordinator,
    status: StatusSlot,
}

impl App {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        let status = StatusSlot::new();
        let session = Arc::new(SessionManager::new(identity, store.clone()));
        let directory = Arc::new(DirectoryCache::new(store.clone(), session.subscribe()));
        let team = Arc::new(TeamContext::new(store.clone(), session.subscribe()));
        let tasks = TaskStore::new(store.clone(), team.subscribe_active());
        let mutations = MutationCoordinator::new(
            store,
            blobs,
            session.clone(),
            directory.clone(),
            team.clone(),
            status.clone(),
            confirm,
        );
        Self {
            session,
            directory,
            team,
            tasks,
            mutations,
            status,
        }
    }

    pub fn status(&self) -> watch::Receiver<Option<Status>> {
        self.status.subscribe()
    }

    /// Current board view for a filter selection; recomputed on demand,
    /// never cached.
    pub fn board(&self, filter: &TaskFilter) -> Projection {
        project(&self.tasks.current(), filter)
    }
}
