use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, TaskPriority, TaskStatus};

/// Task document in a team's `tasks` sub-collection.
///
/// `assigned_to` is fixed to the creator at creation time; `status` is the
/// only field mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub assigned_to: DocumentId,
    pub assigned_to_email: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_by: DocumentId,
    pub created_at: DateTime<Utc>,
}

/// User-entered fields for a new task. Everything but the title is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub priority: TaskPriority,
}

/// An image picked for attachment to a new task. The blob is uploaded
/// before the task record is written; the record only carries the
/// resolved retrieval URL.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
