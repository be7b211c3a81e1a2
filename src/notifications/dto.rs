use serde::Serialize;

use super::repo_types::Notification;

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub unread: i64,
    pub items: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct MarkedAll {
    pub updated: u64,
}
