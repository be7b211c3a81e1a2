use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::OnlineUser;
use crate::groups::repo_types::JoinedGroup;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetTokenStatus {
    pub valid: bool,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityItem {
    pub group_id: Uuid,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub groups_count: i64,
    pub courses_count: i64,
    pub members_count: i64,
    pub unread_notifications: i64,
    pub library_purchases_count: i64,
    pub online_users: Vec<OnlineUser>,
    pub activities: Vec<ActivityItem>,
    pub recent_groups: Vec<JoinedGroup>,
}
