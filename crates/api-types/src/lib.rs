//! Shared types for the task tracker: entities persisted in the remote
//! document store and the request types user intents are expressed with.

mod task;
mod team;
mod types;
mod user;

pub use task::{CreateTaskRequest, ImageAttachment, Task};
pub use team::{Membership, Team};
pub use types::{DocumentId, MemberRole, TaskPriority, TaskStatus};
pub use user::UserProfile;
