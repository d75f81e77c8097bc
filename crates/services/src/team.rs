//! Team context: the active team, its membership roster, and the nested
//! per-member profile fan-out.
//!
//! The roster is a join between two live collections: the team's
//! membership sub-collection and the profile document of each member. The
//! worker keeps an explicit index from user id to resolved profile,
//! updated incrementally by nested observations, and derives the roster as
//! a pure projection over `(memberships, profile index)`; nested
//! callbacks never mutate the roster directly. The roster therefore
//! converges asynchronously: it may transiently hold fewer entries than
//! the membership count while profiles are still resolving.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use api_types::{DocumentId, MemberRole, Membership, UserProfile};
use remote::{DocumentStore, Subscription, server_timestamp, shapes};
use serde_json::json;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    directory::DirectoryCache,
    error::ServiceError,
    live::{self, fields_of},
    session::CurrentUser,
};

/// The team the session is currently working in. At most one at a time;
/// replaced, never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTeam {
    pub id: DocumentId,
    pub name: String,
}

/// One converged roster row: a membership enriched with the member's
/// resolved display name.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub membership: Membership,
    pub username: String,
}

pub struct TeamContext {
    store: Arc<dyn DocumentStore>,
    active: Arc<watch::Sender<Option<ActiveTeam>>>,
    roster: watch::Receiver<Vec<RosterEntry>>,
    worker: JoinHandle<()>,
}

impl TeamContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: watch::Receiver<Option<CurrentUser>>,
    ) -> Self {
        let active = Arc::new(watch::channel(None).0);
        let (roster_tx, roster) = watch::channel(Vec::new());
        let worker = tokio::spawn(run_worker(
            store.clone(),
            active.clone(),
            session,
            roster_tx,
        ));
        Self {
            store,
            active,
            roster,
            worker,
        }
    }

    pub fn active_team(&self) -> Option<ActiveTeam> {
        self.active.borrow().clone()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<Option<ActiveTeam>> {
        let mut rx = self.active.subscribe();
        rx.mark_changed();
        rx
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.roster.borrow().clone()
    }

    pub fn subscribe_roster(&self) -> watch::Receiver<Vec<RosterEntry>> {
        let mut rx = self.roster.clone();
        rx.mark_changed();
        rx
    }

    /// Two dependent writes, sequential and non-transactional: the team
    /// record, then the owner membership in its sub-collection. A failure
    /// of the second write leaves the team without its owner membership;
    /// no compensation is attempted. On success the new team becomes the
    /// active team.
    pub async fn create_team(
        &self,
        user: &CurrentUser,
        name: &str,
    ) -> Result<ActiveTeam, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::Validation("Enter the team name"));
        }
        let team_fields = fields_of(json!({
            "name": name,
            "ownerId": user.id,
            "ownerEmail": user.email,
            "createdAt": server_timestamp(),
        }));
        let team_id = self.store.create(&shapes::teams_path(), team_fields).await?;

        let owner_fields = fields_of(json!({
            "userId": user.id,
            "userEmail": user.email,
            "role": MemberRole::Owner,
            "joinedAt": server_timestamp(),
        }));
        self.store
            .create(&shapes::team_members_path(&team_id), owner_fields)
            .await?;

        let team = ActiveTeam {
            id: team_id,
            name: name.to_string(),
        };
        self.active.send_replace(Some(team.clone()));
        Ok(team)
    }

    /// Add a directory user to the active team with the `member` role.
    /// The candidate is resolved through the directory cache; a stale
    /// selection fails with not-found before any write. There is no
    /// duplicate-membership check on the write path.
    pub async fn add_member(
        &self,
        directory: &DirectoryCache,
        user_id: &DocumentId,
    ) -> Result<(), ServiceError> {
        let candidate = directory.find(user_id).ok_or(ServiceError::UserNotFound)?;
        let team = self.active_team().ok_or(ServiceError::NoActiveTeam)?;
        let fields = fields_of(json!({
            "userId": candidate.id,
            "userEmail": candidate.email,
            "role": MemberRole::Member,
            "joinedAt": server_timestamp(),
        }));
        self.store
            .create(&shapes::team_members_path(&team.id), fields)
            .await?;
        Ok(())
    }
}

impl Drop for TeamContext {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Abort-on-drop handle for a nested observer task. The worker holds one
/// per member, so dropping the worker future (team switch, context drop)
/// tears the nested observations down with it instead of detaching them.
struct ObserverGuard(JoinHandle<()>);

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Roster projection: memberships joined against the profile index.
/// Memberships whose profile has not resolved yet are left out until it
/// arrives.
fn project_roster(
    memberships: &[Membership],
    profiles: &HashMap<DocumentId, UserProfile>,
) -> Vec<RosterEntry> {
    memberships
        .iter()
        .filter_map(|membership| {
            profiles.get(&membership.user_id).map(|profile| RosterEntry {
                membership: membership.clone(),
                username: profile.display_name().to_string(),
            })
        })
        .collect()
}

async fn run_worker(
    store: Arc<dyn DocumentStore>,
    active: Arc<watch::Sender<Option<ActiveTeam>>>,
    mut session: watch::Receiver<Option<CurrentUser>>,
    roster_tx: watch::Sender<Vec<RosterEntry>>,
) {
    let mut active_rx = active.subscribe();
    active_rx.mark_changed();

    let mut members_sub: Option<Subscription> = None;
    let mut memberships: Vec<Membership> = Vec::new();
    let mut profiles: HashMap<DocumentId, UserProfile> = HashMap::new();
    let mut observers: HashMap<DocumentId, ObserverGuard> = HashMap::new();
    let (profile_tx, mut profile_rx) =
        mpsc::unbounded_channel::<(DocumentId, Option<UserProfile>)>();

    loop {
        tokio::select! {
            res = session.changed() => {
                if res.is_err() {
                    break;
                }
                if session.borrow_and_update().is_none() {
                    // Identity gone: clear the active team, which cascades
                    // through the arm below and into the task store.
                    active.send_replace(None);
                }
            }
            res = active_rx.changed() => {
                if res.is_err() {
                    break;
                }
                // Replace-on-change: tear down every subscription belonging
                // to the previous team before touching the new one.
                observers.clear();
                profiles.clear();
                memberships.clear();
                members_sub = active_rx
                    .borrow_and_update()
                    .as_ref()
                    .map(|team| live::subscribe_shape(store.as_ref(), &shapes::team_members_shape(&team.id)));
                roster_tx.send_replace(Vec::new());
            }
            res = wait_members(&mut members_sub) => {
                match res {
                    Err(_) => {
                        members_sub = None;
                    }
                    Ok(()) => {
                        let Some(sub) = members_sub.as_mut() else {
                            continue;
                        };
                        let snapshots = sub.borrow_and_update().clone();
                        memberships = live::decode_set(&snapshots);

                        // Re-establish the nested fan-out for the new member
                        // set: one profile observation per member, no more.
                        let wanted: HashSet<DocumentId> =
                            memberships.iter().map(|m| m.user_id.clone()).collect();
                        observers.retain(|user_id, _| {
                            if wanted.contains(user_id) {
                                true
                            } else {
                                profiles.remove(user_id);
                                false
                            }
                        });
                        for user_id in wanted {
                            if !observers.contains_key(&user_id) {
                                observers.insert(
                                    user_id.clone(),
                                    ObserverGuard(spawn_profile_observer(
                                        store.clone(),
                                        user_id,
                                        profile_tx.clone(),
                                    )),
                                );
                            }
                        }
                        roster_tx.send_replace(project_roster(&memberships, &profiles));
                    }
                }
            }
            Some((user_id, profile)) = profile_rx.recv() => {
                match profile {
                    Some(profile) => {
                        profiles.insert(user_id, profile);
                    }
                    None => {
                        profiles.remove(&user_id);
                    }
                }
                roster_tx.send_replace(project_roster(&memberships, &profiles));
            }
        }
    }
}

async fn wait_members(
    members: &mut Option<Subscription>,
) -> Result<(), watch::error::RecvError> {
    match members.as_mut() {
        Some(sub) => sub.changed().await,
        None => std::future::pending().await,
    }
}

/// Nested observation of one member's profile document. Forwards every
/// change into the roster worker's index channel; aborted when the member
/// leaves or the team changes.
fn spawn_profile_observer(
    store: Arc<dyn DocumentStore>,
    user_id: DocumentId,
    tx: mpsc::UnboundedSender<(DocumentId, Option<UserProfile>)>,
) -> JoinHandle<()> {
    let mut rx = store.observe(&shapes::users_path(), &user_id);
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let profile = rx
                .borrow_and_update()
                .as_ref()
                .and_then(|snapshot| match snapshot.deserialize::<UserProfile>() {
                    Ok(profile) => Some(profile),
                    Err(err) => {
                        tracing::warn!(user = %user_id, %err, "skipping undecodable profile");
                        None
                    }
                });
            if tx.send((user_id.clone(), profile)).is_err() {
                break;
            }
        }
    })
}
