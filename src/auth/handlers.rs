use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app::API_PREFIX,
    auth::{
        credentials::{check_login, check_new_password, hash_password, is_valid_email},
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        repo::NewUser,
        repo_types::User,
        tokens::{TokenIssuer, TokenKind},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let issued = TokenIssuer::from_ref(state).issue(&user)?;
    Ok(AuthResponse {
        access_token: issued.access,
        refresh_token: issued.refresh,
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.username = payload.username.trim().to_string();
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty()
        || payload.name.is_empty()
        || payload.email.is_empty()
        || payload.password.is_empty()
    {
        return Err(AppError::validation("All fields are required"));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    check_new_password(&payload.password, None)?;

    if User::username_taken(&state.db, &payload.username).await? {
        warn!(username = %payload.username, "username already taken");
        return Err(AppError::conflict("Username already taken"));
    }
    if User::email_taken(&state.db, &payload.email, None).await? {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::conflict("Email already registered"));
    }

    let hash = hash_password(&payload.password)?;
    let verification_token = Uuid::new_v4().to_string();

    let user = User::create(
        &state.db,
        NewUser {
            username: &payload.username,
            name: &payload.name,
            email: &payload.email,
            password_hash: &hash,
            verification_token: &verification_token,
        },
    )
    .await?
    // lost a race with a concurrent registration
    .ok_or_else(|| AppError::conflict("Username or email already registered"))?;

    let link = state
        .config
        .link(&format!("{API_PREFIX}/user/verify-email/{verification_token}"));
    let body = format!(
        "Hello {},\n\nWelcome to StudyHub. Confirm your email address here:\n{}\n",
        user.name, link
    );
    if let Err(e) = state.mailer.send(&user.email, "Verify your email", &body).await {
        // registration stands; the user can still log in unverified
        warn!(error = %e, user_id = %user.id, "verification mail failed");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let found = User::find_by_email(&state.db, &payload.email).await?;
    let user = check_login(found, &payload.password).map_err(|e| {
        warn!(email = %payload.email, "login rejected");
        e
    })?;

    User::touch(&state.db, user.id).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let claims = TokenIssuer::from_ref(&state).read(&payload.refresh_token, TokenKind::Refresh)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    if let Err(e) = claims.check_session(&user) {
        warn!(user_id = %user.id, "refresh after logout");
        return Err(e);
    }

    Ok(Json(issue_tokens(&state, user)?))
}

/// Retires every refresh token of the caller. Access tokens run out on their own.
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    User::end_sessions(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    info!(%user_id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        error!(user_id = %user_id, "user not found");
        AppError::Unauthorized("User not found".into())
    })?;

    Ok(Json(PublicUser::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::tokens::tests::user,
        test_support::{insert_user, PASSWORD},
    };
    use sqlx::PgPool;

    #[test]
    fn public_user_leaves_secrets_out() {
        let u = User {
            password_hash: "$argon2id$v=19$secret".into(),
            reset_password_token: Some("reset-abc".into()),
            email_verification_token: Some("verify-abc".into()),
            ..user(true)
        };
        let json = serde_json::to_string(&PublicUser::from(u)).unwrap();
        assert!(json.contains("\"role\":\"admin\""));
        assert!(json.contains("abena@school.edu.gh"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("reset-abc"));
        assert!(!json.contains("verify-abc"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn refresh_is_refused_after_logout(pool: PgPool) {
        let state = AppState::with_pool(pool.clone());
        let user = insert_user(&pool, "efua").await;
        let user_id = user.id;
        let first = issue_tokens(&state, user).unwrap();

        let Json(renewed) = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: first.refresh_token.clone(),
            }),
        )
        .await
        .unwrap();

        logout(State(state.clone()), AuthUser(user_id)).await.unwrap();

        for token in [first.refresh_token, renewed.refresh_token] {
            let err = refresh(State(state.clone()), Json(RefreshRequest { refresh_token: token }))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Session has ended"));
        }

        // signing in again starts a new session
        let Json(again) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "EFUA@studyhub.test ".into(),
                password: PASSWORD.into(),
            }),
        )
        .await
        .unwrap();
        assert!(refresh(
            State(state),
            Json(RefreshRequest {
                refresh_token: again.refresh_token
            })
        )
        .await
        .is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn login_with_wrong_password_is_unauthorized(pool: PgPool) {
        let state = AppState::with_pool(pool.clone());
        insert_user(&pool, "mensah").await;
        let err = login(
            State(state),
            Json(LoginRequest {
                email: "mensah@studyhub.test".into(),
                password: "not-the-password".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid credentials"));
    }
}
