//! Live, ordered task list of the active team.
//!
//! The list is replaced wholesale on every push, in the store's
//! newest-first order; nothing is patched incrementally. Empty while no
//! team is active.

use std::sync::Arc;

use api_types::Task;
use remote::{DocumentStore, Subscription, shapes};
use tokio::{sync::watch, task::JoinHandle};

use crate::{live, team::ActiveTeam};

pub struct TaskStore {
    tasks: watch::Receiver<Vec<Task>>,
    worker: JoinHandle<()>,
}

impl TaskStore {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        team: watch::Receiver<Option<ActiveTeam>>,
    ) -> Self {
        let (tx, tasks) = watch::channel(Vec::new());
        let worker = tokio::spawn(run_worker(store, team, tx));
        Self { tasks, worker }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        let mut rx = self.tasks.clone();
        rx.mark_changed();
        rx
    }

    pub fn current(&self) -> Vec<Task> {
        self.tasks.borrow().clone()
    }
}

impl Drop for TaskStore {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker(
    store: Arc<dyn DocumentStore>,
    mut team: watch::Receiver<Option<ActiveTeam>>,
    tx: watch::Sender<Vec<Task>>,
) {
    let mut subscription: Option<Subscription> = None;
    loop {
        tokio::select! {
            res = team.changed() => {
                if res.is_err() {
                    break;
                }
                // Team switched (or cleared): replace the subscription,
                // never merge lists across teams.
                subscription = team
                    .borrow_and_update()
                    .as_ref()
                    .map(|t| live::subscribe_shape(store.as_ref(), &shapes::team_tasks_shape(&t.id)));
                if subscription.is_none() {
                    tx.send_replace(Vec::new());
                }
            }
            res = wait_tasks(&mut subscription) => {
                match res {
                    Err(_) => {
                        subscription = None;
                    }
                    Ok(()) => {
                        if let Some(sub) = subscription.as_mut() {
                            let snapshots = sub.borrow_and_update().clone();
                            tx.send_replace(live::decode_set(&snapshots));
                        }
                    }
                }
            }
        }
    }
}

async fn wait_tasks(
    subscription: &mut Option<Subscription>,
) -> Result<(), watch::error::RecvError> {
    match subscription.as_mut() {
        Some(sub) => sub.changed().await,
        None => std::future::pending().await,
    }
}
