use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{HomePage, PostRequest},
    repo,
    repo_types::BlogPost,
    services,
};
use crate::{
    auth::AdminUser,
    catalog,
    error::{AppError, AppResult},
    state::AppState,
};

const HOME_POSTS: i64 = 3;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/posts", get(list_posts))
        .route("/admin/post/new", post(create_post))
        .route("/admin/post/edit/:id", post(edit_post))
        .route("/admin/post/delete/:id", post(delete_post))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/post/:slug", get(view_post))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0))]
pub async fn list_posts(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<Vec<BlogPost>>> {
    Ok(Json(repo::list_all(&state.db).await?))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.0))]
pub async fn create_post(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<PostRequest>,
) -> AppResult<(StatusCode, Json<BlogPost>)> {
    let post = services::create(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.0))]
pub async fn edit_post(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostRequest>,
) -> AppResult<Json<BlogPost>> {
    Ok(Json(services::edit(&state.db, id, payload).await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0))]
pub async fn delete_post(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> AppResult<Json<HomePage>> {
    let latest_posts = repo::latest_published(&state.db, HOME_POSTS).await?;
    let categories = catalog::repo::categories(&state.db).await?;
    Ok(Json(HomePage {
        latest_posts,
        categories,
    }))
}

#[instrument(skip(state))]
pub async fn view_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<BlogPost>> {
    repo::find_published_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Post not found"))
}
