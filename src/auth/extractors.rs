use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::{
    repo_types::Role,
    tokens::{Claims, TokenIssuer, TokenKind},
};
use crate::error::{AppError, AppResult};

fn bearer(parts: &Parts) -> Option<AppResult<&str>> {
    let value = parts.headers.get(AUTHORIZATION)?;
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()));
    Some(token)
}

fn access_claims<S>(parts: &Parts, state: &S) -> Option<AppResult<Claims>>
where
    TokenIssuer: FromRef<S>,
{
    bearer(parts).map(|token| TokenIssuer::from_ref(state).read(token?, TokenKind::Access))
}

/// Caller id from a Bearer access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)
            .unwrap_or_else(|| Err(AppError::Unauthorized("Missing Authorization header".into())))?;
        Ok(AuthUser(claims.sub))
    }
}

/// `None` for anonymous requests. A token that is present but bad is still a 401.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let viewer = access_claims(parts, state).transpose()?.map(|c| c.sub);
        Ok(MaybeAuthUser(viewer))
    }
}

/// Caller whose access token was issued with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)
            .unwrap_or_else(|| Err(AppError::Unauthorized("Missing Authorization header".into())))?;
        if let Err(e) = claims.role.require(Role::Admin) {
            warn!(user_id = %claims.sub, "admin access denied");
            return Err(e);
        }
        Ok(AdminUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::tokens::tests::user, state::AppState};
    use axum::http::Request;

    fn parts(auth: Option<String>) -> Parts {
        let mut req = Request::builder().uri("/");
        if let Some(v) = auth {
            req = req.header(AUTHORIZATION, v);
        }
        req.body(()).unwrap().into_parts().0
    }

    fn bearer_for(state: &AppState, is_admin: bool) -> String {
        let issued = TokenIssuer::from_ref(state).issue(&user(is_admin)).unwrap();
        format!("Bearer {}", issued.access)
    }

    #[tokio::test]
    async fn members_are_forbidden_from_admin_extractor() {
        let state = AppState::fake();
        let mut p = parts(Some(bearer_for(&state, false)));
        let err = AdminUser::from_request_parts(&mut p, &state).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let mut p = parts(Some(bearer_for(&state, true)));
        assert!(AdminUser::from_request_parts(&mut p, &state).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_token_cannot_stand_in_for_access() {
        let state = AppState::fake();
        let issued = TokenIssuer::from_ref(&state).issue(&user(true)).unwrap();
        let mut p = parts(Some(format!("Bearer {}", issued.refresh)));
        let err = AuthUser::from_request_parts(&mut p, &state).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let mut p = parts(Some("Basic YWJlbmE6cHc=".into()));
        let err = AuthUser::from_request_parts(&mut p, &state).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid Authorization header"));
    }

    #[tokio::test]
    async fn anonymous_viewer_is_none_but_garbage_is_rejected() {
        let state = AppState::fake();
        let mut p = parts(None);
        let MaybeAuthUser(viewer) = MaybeAuthUser::from_request_parts(&mut p, &state)
            .await
            .unwrap();
        assert!(viewer.is_none());

        let mut p = parts(Some("Bearer garbage".into()));
        assert!(MaybeAuthUser::from_request_parts(&mut p, &state).await.is_err());

        let mut p = parts(None);
        assert!(matches!(
            AuthUser::from_request_parts(&mut p, &state).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
