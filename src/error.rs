use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-level failure, mapped onto an HTTP status in `into_response`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(e) => {
                // never leak driver or mail errors to the client
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// True when `err` is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_body_is_generic() {
        let res = AppError::from(anyhow::anyhow!("password=hunter2")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn row_not_found_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicate_username_is_a_unique_violation(pool: sqlx::PgPool) {
        let insert = "INSERT INTO users (username, name, email, password_hash) VALUES ($1, $1, $2, 'x')";
        sqlx::query(insert)
            .bind("nana")
            .bind("nana@studyhub.test")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query(insert)
            .bind("nana")
            .bind("nana2@studyhub.test")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let err = sqlx::query("INSERT INTO users (username) VALUES ('kwesi')")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(!is_unique_violation(&err));
    }
}
