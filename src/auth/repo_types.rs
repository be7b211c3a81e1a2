use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub is_admin: bool,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub email_verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing, with = "time::serde::rfc3339::option")]
    pub reset_token_expiry: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub session_version: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Coarse permission level. Admins manage the blog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn require(self, needed: Role) -> AppResult<()> {
        match (self, needed) {
            (Role::Admin, _) | (Role::Member, Role::Member) => Ok(()),
            (Role::Member, Role::Admin) => Err(AppError::forbidden("Access denied.")),
        }
    }
}

impl User {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_cannot_act_as_admin() {
        assert!(Role::Member.require(Role::Member).is_ok());
        assert!(Role::Admin.require(Role::Member).is_ok());
        assert!(Role::Admin.require(Role::Admin).is_ok());
        let err = Role::Member.require(Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
