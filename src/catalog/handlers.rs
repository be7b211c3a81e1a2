use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{Children, CourseFilter, PurchaseResponse, ResourceListing, ResourceView, SubjectsOfLevel},
    repo,
    repo_types::{
        Catalog, Course, CourseCategory, Level, LibraryCategory, LibraryLevel, LibrarySubject,
        Subject,
    },
    services::{self, PurchaseOutcome},
};
use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/category/:id", get(category_courses))
        .route("/courses/course/:id/levels", get(course_levels))
        .route("/courses/level/:id/subjects", get(level_subjects))
        .route(
            "/courses/level/:id/subject/:subject_id/resources",
            get(course_resources),
        )
        .route("/courses/resource/:id", get(course_resource))
        .route("/courses/resource/:id/purchase", post(purchase_course_resource))
}

pub fn library_routes() -> Router<AppState> {
    Router::new()
        .route("/library/categories", get(library_categories))
        .route("/library/categories/:id/levels", get(library_levels))
        .route("/library/levels/:id/subjects", get(library_subjects))
        .route("/library/subjects/:id/resources", get(library_resources))
        .route("/library/resource/:id", get(library_resource))
        .route("/library/resource/:id/purchase", post(purchase_library_resource))
}

// --- courses ---

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(repo::courses(&state.db, filter.category_id).await?))
}

#[instrument(skip(state))]
pub async fn category_courses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Children<CourseCategory, Course>>> {
    let parent = repo::category(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    let items = repo::courses(&state.db, Some(id)).await?;
    Ok(Json(Children { parent, items }))
}

#[instrument(skip(state))]
pub async fn course_levels(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Children<Course, Level>>> {
    let parent = repo::course(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    let items = repo::levels(&state.db, id).await?;
    Ok(Json(Children { parent, items }))
}

#[instrument(skip(state))]
pub async fn level_subjects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubjectsOfLevel>> {
    let level = repo::level(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Level not found"))?;
    let subjects = repo::subjects_of_level(&state.db, id).await?;
    Ok(Json(SubjectsOfLevel::split(level, subjects)))
}

#[instrument(skip(state))]
pub async fn course_resources(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path((level_id, subject_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ResourceListing<Subject>>> {
    let listing_id = repo::level_subject_id(&state.db, level_id, subject_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subject is not offered at this level"))?;
    let subject = repo::subject(&state.db, subject_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subject not found"))?;
    let rows = repo::list_resources(&state.db, Catalog::Course, listing_id, viewer).await?;
    Ok(Json(ResourceListing {
        parent: subject,
        resources: rows.into_iter().map(ResourceView::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn course_resource(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ResourceView>> {
    resource_view(&state, Catalog::Course, id, viewer).await
}

#[instrument(skip(state))]
pub async fn purchase_course_resource(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<PurchaseResponse>)> {
    purchase(&state, Catalog::Course, user_id, id).await
}

// --- library (signed-in only) ---

#[instrument(skip(state))]
pub async fn library_categories(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> AppResult<Json<Vec<LibraryCategory>>> {
    Ok(Json(repo::library_categories(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn library_levels(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Children<LibraryCategory, LibraryLevel>>> {
    let parent = repo::library_category(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    let items = repo::library_levels(&state.db, id).await?;
    Ok(Json(Children { parent, items }))
}

#[instrument(skip(state))]
pub async fn library_subjects(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Children<LibraryLevel, LibrarySubject>>> {
    let parent = repo::library_level(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Level not found"))?;
    let items = repo::library_subjects(&state.db, id).await?;
    Ok(Json(Children { parent, items }))
}

#[instrument(skip(state))]
pub async fn library_resources(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ResourceListing<LibrarySubject>>> {
    let subject = repo::library_subject(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Subject not found"))?;
    let rows = repo::list_resources(&state.db, Catalog::Library, id, Some(user_id)).await?;
    Ok(Json(ResourceListing {
        parent: subject,
        resources: rows.into_iter().map(ResourceView::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn library_resource(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ResourceView>> {
    resource_view(&state, Catalog::Library, id, Some(user_id)).await
}

#[instrument(skip(state))]
pub async fn purchase_library_resource(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<PurchaseResponse>)> {
    purchase(&state, Catalog::Library, user_id, id).await
}

// --- shared ---

async fn resource_view(
    state: &AppState,
    catalog: Catalog,
    id: Uuid,
    viewer: Option<Uuid>,
) -> AppResult<Json<ResourceView>> {
    let row = repo::find_resource(&state.db, catalog, id, viewer)
        .await?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;
    Ok(Json(ResourceView::from(row)))
}

async fn purchase(
    state: &AppState,
    catalog: Catalog,
    user_id: Uuid,
    id: Uuid,
) -> AppResult<(StatusCode, Json<PurchaseResponse>)> {
    let (resource, outcome) = services::purchase(&state.db, catalog, user_id, id).await?;
    let status = match outcome {
        PurchaseOutcome::Purchased(_) => StatusCode::CREATED,
        PurchaseOutcome::AlreadyOwned | PurchaseOutcome::Free => {
            info!(%user_id, resource_id = %id, ?catalog, "purchase skipped");
            StatusCode::OK
        }
    };
    Ok((status, Json(PurchaseResponse::new(&resource.title, outcome))))
}
