use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::error::is_unique_violation;

const USER_COLUMNS: &str = "id, username, name, email, password_hash, is_admin, email_verified, \
     email_verification_token, reset_password_token, reset_token_expiry, session_version, last_active, created_at";

/// Fields needed to insert a user row.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub verification_token: &'a str,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn username_taken(db: &PgPool, username: &str) -> anyhow::Result<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(db)
                .await
                .context("check username")?;
        Ok(taken)
    }

    /// Whether `email` belongs to a user other than `except`.
    pub async fn email_taken(db: &PgPool, email: &str, except: Option<Uuid>) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(db)
        .await
        .context("check email")?;
        Ok(taken)
    }

    /// Create a new user. `Ok(None)` when username or email is already taken.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<Option<User>> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, name, email, password_hash, email_verification_token)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.verification_token)
        .fetch_one(db)
        .await;

        match res {
            Ok(user) => Ok(Some(user)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).context("insert user"),
        }
    }

    /// `Ok(false)` when the new email collides with another account.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: &str,
        email: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET name = $2, email = $3 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(email)
            .execute(db)
            .await;
        match res {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e).context("update profile"),
        }
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await
            .context("set password")?;
        Ok(())
    }

    pub async fn touch(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_active = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("touch last_active")?;
        Ok(())
    }

    pub async fn store_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_token_expiry = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await
        .context("store reset token")?;
        Ok(())
    }

    pub async fn find_by_reset_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_password_token = $1"
        ))
        .bind(token)
        .fetch_optional(db)
        .await
        .context("find user by reset token")?;
        Ok(user)
    }

    /// Sets the password and clears the token only if `token` is still current.
    /// Returns whether a row was updated.
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let done = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, reset_password_token = NULL, reset_token_expiry = NULL,
                   session_version = session_version + 1
             WHERE reset_password_token = $1 AND reset_token_expiry >= now()
            "#,
        )
        .bind(token)
        .bind(password_hash)
        .execute(db)
        .await
        .context("consume reset token")?;
        Ok(done.rows_affected() == 1)
    }

    /// Invalidates every refresh token issued so far. Returns the new version,
    /// `None` when the user is gone.
    pub async fn end_sessions(db: &PgPool, id: Uuid) -> anyhow::Result<Option<i32>> {
        let version = sqlx::query_scalar(
            "UPDATE users SET session_version = session_version + 1 WHERE id = $1 RETURNING session_version",
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("end sessions")?;
        Ok(version)
    }

    /// Marks the owner of `token` verified. Returns whether a row matched.
    pub async fn verify_email_token(db: &PgPool, token: &str) -> anyhow::Result<bool> {
        let done = sqlx::query(
            r#"
            UPDATE users
               SET email_verified = TRUE, email_verification_token = NULL
             WHERE email_verification_token = $1
            "#,
        )
        .bind(token)
        .execute(db)
        .await
        .context("verify email token")?;
        Ok(done.rows_affected() == 1)
    }
}
