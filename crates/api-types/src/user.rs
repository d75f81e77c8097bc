use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DocumentId;

/// User profile document as stored in the `users` collection.
///
/// Written once at registration under the identity's uid; `username` is
/// mutable by profile edit and live subscriptions must reflect changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: DocumentId,
    pub uid: DocumentId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Display label used wherever a user is shown: username, falling back
    /// to email when the username is empty.
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}
