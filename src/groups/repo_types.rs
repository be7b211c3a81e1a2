use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::membership::RequestStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub is_approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JoinRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Pending request as shown to the group owner.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DiscussionMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A group the user joined, for the dashboard.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JoinedGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// One discussion post in the activity feed.
#[derive(Debug, Clone, FromRow)]
pub struct Activity {
    pub username: String,
    pub group_id: Uuid,
    pub group_name: String,
    pub created_at: OffsetDateTime,
}

impl Activity {
    pub fn summary(&self) -> String {
        format!("{} posted in {}", self.username, self.group_name)
    }
}
