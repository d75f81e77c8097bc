use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, MemberRole};

/// Team document. Created exactly once per "create team" action and
/// immutable afterwards; the creator becomes the single owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub id: DocumentId,
    pub name: String,
    pub owner_id: DocumentId,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
}

/// Membership record in a team's `members` sub-collection.
///
/// A team has exactly one `owner` membership. It is the second of two
/// sequential writes at team creation; there is no transaction across
/// the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    #[serde(default)]
    pub id: DocumentId,
    pub user_id: DocumentId,
    pub user_email: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}
