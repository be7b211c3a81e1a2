use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ActivityItem, Dashboard},
    repo,
};
use crate::{
    app::API_PREFIX,
    auth::{
        credentials::{check_new_password, hash_password, is_valid_email, password_matches},
        User,
    },
    catalog::{self, repo_types::Catalog},
    error::{AppError, AppResult},
    groups, notifications,
    state::AppState,
};

/// Users seen within this window count as online on the dashboard.
pub const DASHBOARD_ONLINE_MINUTES: i64 = 5;
const DASHBOARD_FEED_LEN: i64 = 5;

async fn load_user(state: &AppState, user_id: Uuid) -> AppResult<User> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

pub async fn profile(state: &AppState, user_id: Uuid) -> AppResult<User> {
    load_user(state, user_id).await
}

#[instrument(skip(state))]
pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    name: &str,
    email: &str,
) -> AppResult<User> {
    let name = name.trim();
    let email = email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::validation("Name and email are required."));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    if User::email_taken(&state.db, &email, Some(user_id)).await? {
        return Err(AppError::conflict("This email is already in use."));
    }
    // the unique index has the last word if two updates race
    if !User::update_profile(&state.db, user_id, name, &email).await? {
        return Err(AppError::conflict("This email is already in use."));
    }
    info!(%user_id, "profile updated");
    load_user(state, user_id).await
}

#[instrument(skip_all, fields(%user_id))]
pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    current: &str,
    new: &str,
    confirm: &str,
) -> AppResult<()> {
    let user = load_user(state, user_id).await?;
    if !password_matches(current, &user.password_hash) {
        warn!(%user_id, "change password with wrong current password");
        return Err(AppError::validation("Current password is incorrect."));
    }
    check_new_password(new, Some(confirm))?;
    let hash = hash_password(new)?;
    User::set_password(&state.db, user_id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(())
}

pub fn reset_expiry(now: OffsetDateTime, ttl_minutes: i64) -> OffsetDateTime {
    now + Duration::minutes(ttl_minutes)
}

/// A reset token is usable while `now` has not passed its expiry.
pub fn check_reset_window(expiry: Option<OffsetDateTime>, now: OffsetDateTime) -> AppResult<()> {
    match expiry {
        Some(at) if at >= now => Ok(()),
        _ => Err(AppError::validation("Reset token expired.")),
    }
}

/// Issues a reset token and mails the link. Unknown addresses are reported.
#[instrument(skip(state))]
pub async fn forgot_password(state: &AppState, email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::not_found("No user found with that email."))?;

    let token = Uuid::new_v4().simple().to_string();
    let ttl = state.config.reset_token_ttl_minutes;
    let expires_at = reset_expiry(OffsetDateTime::now_utc(), ttl);
    User::store_reset_token(&state.db, user.id, &token, expires_at).await?;

    let link = state
        .config
        .link(&format!("{API_PREFIX}/user/reset-password/{token}"));
    let body = format!(
        "Hello {},\n\nClick the link below to reset your password:\n{}\n\nThis link expires in {} minutes.",
        user.name, link, ttl
    );
    state
        .mailer
        .send(&user.email, "Password Reset Request", &body)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "reset mail failed");
            AppError::Internal(e)
        })?;

    info!(user_id = %user.id, "password reset requested");
    Ok(user.email)
}

/// Owner of a still-valid reset token.
pub async fn reset_token_owner(state: &AppState, token: &str) -> AppResult<User> {
    let user = User::find_by_reset_token(&state.db, token)
        .await?
        .ok_or_else(|| AppError::validation("Invalid or expired reset token."))?;
    check_reset_window(user.reset_token_expiry, OffsetDateTime::now_utc())?;
    Ok(user)
}

#[instrument(skip_all)]
pub async fn reset_password(
    state: &AppState,
    token: &str,
    new: &str,
    confirm: &str,
) -> AppResult<()> {
    let user = reset_token_owner(state, token).await?;
    check_new_password(new, Some(confirm))?;
    let hash = hash_password(new)?;
    // expiry is checked again in the update itself
    if !User::consume_reset_token(&state.db, token, &hash).await? {
        return Err(AppError::validation("Invalid or expired reset token."));
    }
    info!(user_id = %user.id, "password reset");
    Ok(())
}

#[instrument(skip_all)]
pub async fn verify_email(state: &AppState, token: &str) -> AppResult<()> {
    if !User::verify_email_token(&state.db, token).await? {
        return Err(AppError::validation("Invalid verification token."));
    }
    info!("email verified");
    Ok(())
}

#[instrument(skip(state))]
pub async fn dashboard(state: &AppState, user_id: Uuid) -> AppResult<Dashboard> {
    let db = &state.db;
    let since = OffsetDateTime::now_utc() - Duration::minutes(DASHBOARD_ONLINE_MINUTES);

    let activities = groups::repo::recent_activity(db, DASHBOARD_FEED_LEN)
        .await?
        .into_iter()
        .map(|a| ActivityItem {
            group_id: a.group_id,
            text: a.summary(),
            at: a.created_at,
        })
        .collect();

    Ok(Dashboard {
        groups_count: groups::repo::count_joined(db, user_id).await?,
        courses_count: catalog::repo::count_courses(db).await?,
        members_count: repo::count_users(db).await?,
        unread_notifications: notifications::repo::unread_count(db, user_id).await?,
        library_purchases_count: catalog::repo::count_purchases(db, Catalog::Library, user_id)
            .await?,
        online_users: repo::online_users(db, since).await?,
        activities,
        recent_groups: groups::repo::recently_joined(db, user_id, DASHBOARD_FEED_LEN).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_window_is_inclusive_until_expiry() {
        let now = OffsetDateTime::now_utc();
        let expiry = reset_expiry(now, 30);
        assert_eq!(expiry - now, Duration::minutes(30));
        assert!(check_reset_window(Some(expiry), now).is_ok());
        assert!(check_reset_window(Some(expiry), expiry).is_ok());
        assert!(check_reset_window(Some(expiry), expiry + Duration::seconds(1)).is_err());
    }

    #[test]
    fn missing_expiry_is_treated_as_expired() {
        let err = check_reset_window(None, OffsetDateTime::now_utc()).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Reset token expired."));
    }

    #[tokio::test]
    async fn blank_profile_fields_are_rejected_early() {
        let state = AppState::fake();
        let err = update_profile(&state, Uuid::new_v4(), "  ", "a@b.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_profile(&state, Uuid::new_v4(), "Ama", "not-an-email")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
