use serde::{Deserialize, Serialize};

use super::repo_types::{DiscussionMessage, Group, JoinRequest, PendingRequest};

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub message: String,
}

/// Group page as the viewer sees it. Messages are only filled in for
/// members, join requests only for the owner.
#[derive(Debug, Serialize)]
pub struct GroupDetail {
    pub group: Group,
    pub member_count: i64,
    pub is_member: bool,
    pub is_owner: bool,
    pub pending_request: Option<JoinRequest>,
    pub join_requests: Vec<PendingRequest>,
    pub messages: Vec<DiscussionMessage>,
}

#[derive(Debug, Serialize)]
pub struct MessagesView {
    pub messages: Vec<DiscussionMessage>,
    pub online_count: i64,
}
