//! Synchronization core of the task tracker.
//!
//! Binds the remote document store to local view state: live projections
//! of the user directory, team membership roster and task list, plus a
//! coordinator that funnels every user-initiated write back to the store.
//! Writes are never applied optimistically; the subscriptions are the
//! single source of truth.

pub mod app;
pub mod directory;
pub mod error;
mod live;
pub mod logging;
pub mod mutations;
pub mod projector;
pub mod session;
pub mod status;
pub mod tasks;
pub mod team;

pub use app::App;
pub use directory::DirectoryCache;
pub use error::ServiceError;
pub use mutations::{AlwaysConfirm, Confirm, MutationCoordinator};
pub use projector::{Projection, TaskFilter, project};
pub use session::{CurrentUser, SessionManager};
pub use status::{Status, StatusSlot};
pub use tasks::TaskStore;
pub use team::{ActiveTeam, RosterEntry, TeamContext};
