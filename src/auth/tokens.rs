//! Access and refresh tokens.
//!
//! Access tokens carry enough about the caller (role, email state) for
//! extractors to decide without a database round trip. Refresh tokens carry
//! the session version they were issued under; logging out bumps the stored
//! version, which retires every outstanding refresh token at once.

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error};
use uuid::Uuid;

use super::repo_types::{Role, User};
use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
    pub role: Role,
    pub email_verified: bool,
    /// `users.session_version` at issue time.
    pub sv: i32,
}

impl Claims {
    fn for_user(user: &User, kind: TokenKind, now: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            sub: user.id,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            iss: String::new(),
            aud: String::new(),
            kind,
            role: user.role(),
            email_verified: user.email_verified,
            sv: user.session_version,
        }
    }

    /// A refresh token only renews while the user's session version is unchanged.
    pub fn check_session(&self, user: &User) -> AppResult<()> {
        if self.sv != user.session_version {
            return Err(AppError::Unauthorized("Session has ended".into()));
        }
        Ok(())
    }
}

/// Signing half and verifying half of the configured HS256 secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(state: &AppState) -> Self {
        TokenIssuer::new(&state.config.jwt)
    }
}

/// Token pair handed out on register, login and refresh.
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[cfg.issuer.as_str()]);
        validation.set_audience(&[cfg.audience.as_str()]);
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::minutes(cfg.ttl_minutes),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes),
        }
    }

    fn sign(&self, user: &User, kind: TokenKind) -> AppResult<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let mut claims = Claims::for_user(user, kind, OffsetDateTime::now_utc(), ttl);
        claims.iss = self.issuer.clone();
        claims.aud = self.audience.clone();
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, user_id = %user.id, ?kind, "token signing failed");
            AppError::Internal(e.into())
        })
    }

    pub fn issue(&self, user: &User) -> AppResult<IssuedTokens> {
        Ok(IssuedTokens {
            access: self.sign(user, TokenKind::Access)?,
            refresh: self.sign(user, TokenKind::Refresh)?,
        })
    }

    /// Decodes `token` and insists on `expected` kind. Every failure is a 401.
    pub fn read(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                AppError::Unauthorized("Invalid or expired token".into())
            })?
            .claims;
        if claims.kind != expected {
            let msg = match expected {
                TokenKind::Access => "Access token required",
                TokenKind::Refresh => "Refresh token required",
            };
            return Err(AppError::Unauthorized(msg.into()));
        }
        Ok(claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn user(is_admin: bool) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "abena".into(),
            name: "Abena Owusu".into(),
            email: "abena@school.edu.gh".into(),
            password_hash: String::new(),
            is_admin,
            email_verified: false,
            email_verification_token: None,
            reset_password_token: None,
            reset_token_expiry: None,
            session_version: 0,
            last_active: now,
            created_at: now,
        }
    }

    fn issuer_for(iss: &str, aud: &str) -> TokenIssuer {
        TokenIssuer::new(&JwtConfig {
            secret: "shared".into(),
            issuer: iss.into(),
            audience: aud.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[tokio::test]
    async fn access_token_carries_role_and_email_state() {
        let tokens = TokenIssuer::from_ref(&AppState::fake());
        let mut admin = user(true);
        admin.email_verified = true;
        let issued = tokens.issue(&admin).unwrap();

        let claims = tokens.read(&issued.access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.email_verified);
        assert_eq!(claims.iss, "test-issuer");

        let member = tokens.issue(&user(false)).unwrap();
        let claims = tokens.read(&member.access, TokenKind::Access).unwrap();
        assert_eq!(claims.role, Role::Member);
        assert!(!claims.email_verified);
    }

    #[tokio::test]
    async fn kinds_are_not_interchangeable() {
        let tokens = TokenIssuer::from_ref(&AppState::fake());
        let issued = tokens.issue(&user(false)).unwrap();
        let err = tokens.read(&issued.access, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Refresh token required"));
        let err = tokens.read(&issued.refresh, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Access token required"));
    }

    #[test]
    fn tokens_from_another_deployment_are_unauthorized() {
        let ours = issuer_for("studyhub", "studyhub-users");
        let theirs = issuer_for("elsewhere", "other-users");
        let issued = theirs.issue(&user(true)).unwrap();
        assert!(matches!(
            ours.read(&issued.access, TokenKind::Access),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            ours.read("not.a.jwt", TokenKind::Access),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn refresh_stops_working_once_the_session_version_moves() {
        let tokens = TokenIssuer::from_ref(&AppState::fake());
        let mut u = user(false);
        let issued = tokens.issue(&u).unwrap();
        let claims = tokens.read(&issued.refresh, TokenKind::Refresh).unwrap();
        assert!(claims.check_session(&u).is_ok());

        // logout
        u.session_version += 1;
        assert!(matches!(claims.check_session(&u), Err(AppError::Unauthorized(_))));
    }
}
