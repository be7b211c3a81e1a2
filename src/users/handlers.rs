use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        ChangePasswordRequest, Dashboard, ForgotPasswordRequest, MessageResponse,
        ResetPasswordRequest, ResetTokenStatus, UpdateProfileRequest,
    },
    services,
};
use crate::{
    auth::{dto::PublicUser, AuthUser},
    error::AppResult,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile", get(get_profile).post(update_profile))
        .route("/user/change-password", post(change_password))
        .route("/user/forgot-password", post(forgot_password))
        .route(
            "/user/reset-password/:token",
            get(check_reset_token).post(reset_password),
        )
        .route("/user/verify-email/:token", get(verify_email))
        .route("/user/dashboard", get(dashboard))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = services::profile(&state, user_id).await?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = services::update_profile(&state, user_id, &payload.name, &payload.email).await?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::change_password(
        &state,
        user_id,
        &payload.current_password,
        &payload.new_password,
        &payload.confirm_password,
    )
    .await?;
    Ok(Json(MessageResponse::new("Password updated successfully.")))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = services::forgot_password(&state, &payload.email).await?;
    Ok(Json(MessageResponse::new(format!(
        "Password reset link sent to {email}."
    ))))
}

#[instrument(skip_all)]
pub async fn check_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<ResetTokenStatus>> {
    let user = services::reset_token_owner(&state, &token).await?;
    Ok(Json(ResetTokenStatus {
        valid: true,
        email: user.email,
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::reset_password(
        &state,
        &token,
        &payload.new_password,
        &payload.confirm_password,
    )
    .await?;
    Ok(Json(MessageResponse::new(
        "Password reset successfully. You can now login.",
    )))
}

#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    services::verify_email(&state, &token).await?;
    Ok(Json(MessageResponse::new("Email verified successfully.")))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Dashboard>> {
    Ok(Json(services::dashboard(&state, user_id).await?))
}
