use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{MarkedAll, NotificationList},
    repo,
    repo_types::Notification,
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/notifications", get(list_notifications))
        .route("/user/notifications/read", post(mark_all_read))
        .route("/user/notifications/:id/read", post(mark_read))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<NotificationList>> {
    let items = repo::list_for_user(&state.db, user_id).await?;
    let unread = items.iter().filter(|n| !n.is_read).count() as i64;
    Ok(Json(NotificationList { unread, items }))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let n = services::mark_read(&state.db, id, user_id).await?;
    info!(notification_id = %id, %user_id, "notification marked read");
    Ok(Json(n))
}

#[instrument(skip(state))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<MarkedAll>> {
    let updated = repo::set_all_read(&state.db, user_id).await?;
    Ok(Json(MarkedAll { updated }))
}
