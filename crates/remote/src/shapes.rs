//! Shape definitions for the live collections.
//!
//! A `Shape<T>` binds a store query to the entity type its pushes decode
//! into. Every live subscription in the sync engine goes through one of
//! the constructors below, so the collection layout lives in one place.

use std::marker::PhantomData;

use api_types::{DocumentId, Membership, Task, UserProfile};

use crate::store::{CollectionPath, Direction, Query};

pub const USERS: &str = "users";
pub const TEAMS: &str = "teams";

/// Field the task list is ordered on. The ordering is store-level, part of
/// the shape, never a client-side sort.
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const STATUS_FIELD: &str = "status";

/// A live query typed by the entity its result set decodes into.
#[derive(Debug, Clone)]
pub struct Shape<T> {
    query: Query,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Shape<T> {
    fn new(query: Query) -> Self {
        Self {
            query,
            _marker: PhantomData,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

pub fn users_path() -> CollectionPath {
    CollectionPath::new(USERS)
}

pub fn teams_path() -> CollectionPath {
    CollectionPath::new(TEAMS)
}

pub fn team_members_path(team_id: &DocumentId) -> CollectionPath {
    CollectionPath::new(format!("{TEAMS}/{team_id}/members"))
}

pub fn team_tasks_path(team_id: &DocumentId) -> CollectionPath {
    CollectionPath::new(format!("{TEAMS}/{team_id}/tasks"))
}

// =============================================================================
// Shape constructors
// =============================================================================

/// The full registered-user directory.
pub fn users_shape() -> Shape<UserProfile> {
    Shape::new(Query::collection(users_path()))
}

/// Membership roster of one team, unordered.
pub fn team_members_shape(team_id: &DocumentId) -> Shape<Membership> {
    Shape::new(Query::collection(team_members_path(team_id)))
}

/// Task list of one team, newest first.
pub fn team_tasks_shape(team_id: &DocumentId) -> Shape<Task> {
    Shape::new(
        Query::collection(team_tasks_path(team_id))
            .order_by(CREATED_AT_FIELD, Direction::Descending),
    )
}
