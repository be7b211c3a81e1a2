use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::Duration;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateGroupRequest, GroupDetail, GroupQuery, MessagesView, PostMessageRequest},
    membership,
    repo,
    repo_types::{DiscussionMessage, Group, GroupSummary, JoinRequest, PendingRequest},
    services,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:id", get(group_detail))
        .route("/groups/:id/messages", get(read_messages).post(post_message))
        .route("/groups/:id/request", post(request_join))
        .route("/groups/:id/leave", post(leave_group))
        .route("/groups/:id/requests", get(list_requests))
        .route("/groups/requests/:id/approve", post(approve_request))
        .route("/groups/requests/:id/reject", post(reject_request))
}

#[instrument(skip(state))]
pub async fn list_groups(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(query): Query<GroupQuery>,
) -> AppResult<Json<Vec<GroupSummary>>> {
    let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    Ok(Json(repo::list_groups(&state.db, q).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<Group>)> {
    let group = services::create_group(
        &state.db,
        user_id,
        &payload.name,
        payload.description.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[instrument(skip(state))]
pub async fn group_detail(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GroupDetail>> {
    let group = repo::find_group(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    let is_member = repo::find_member(&state.db, user_id, id)
        .await?
        .map(|m| m.is_approved)
        .unwrap_or(false);
    let is_owner = group.owner_id == user_id;

    let messages = if is_member {
        repo::messages(&state.db, id).await?
    } else {
        Vec::new()
    };
    let join_requests = if is_owner {
        repo::pending_requests(&state.db, id).await?
    } else {
        Vec::new()
    };
    let pending_request = repo::pending_request_for(&state.db, user_id, id).await?;
    let member_count = repo::member_count(&state.db, id).await?;

    Ok(Json(GroupDetail {
        group,
        member_count,
        is_member,
        is_owner,
        pending_request,
        join_requests,
        messages,
    }))
}

#[instrument(skip(state))]
pub async fn read_messages(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessagesView>> {
    let window = Duration::minutes(state.config.online_window_minutes);
    let (messages, online_count) = services::read_messages(&state.db, id, user_id, window).await?;
    Ok(Json(MessagesView { messages, online_count }))
}

#[instrument(skip(state, payload))]
pub async fn post_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<DiscussionMessage>)> {
    let message = services::post_message(&state.db, id, user_id, &payload.message).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state))]
pub async fn request_join(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<JoinRequest>)> {
    let request = services::request_join(&state.db, id, user_id).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[instrument(skip(state))]
pub async fn leave_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::leave(&state.db, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_requests(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<PendingRequest>>> {
    let group = repo::find_group(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    membership::check_owner(group.owner_id, user_id)?;
    Ok(Json(repo::pending_requests(&state.db, id).await?))
}

#[instrument(skip(state))]
pub async fn approve_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JoinRequest>> {
    Ok(Json(services::decide(&state.db, id, user_id, true).await?))
}

#[instrument(skip(state))]
pub async fn reject_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JoinRequest>> {
    Ok(Json(services::decide(&state.db, id, user_id, false).await?))
}
