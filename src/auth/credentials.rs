use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::error;

use super::repo_types::User;
use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Length rule, plus the confirmation field where the form has one.
pub fn check_new_password(password: &str, confirm: Option<&str>) -> AppResult<()> {
    if confirm.is_some_and(|c| c != password) {
        return Err(AppError::validation("Passwords do not match."));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password too short"));
    }
    Ok(())
}

/// Argon2id PHC string for `users.password_hash`.
pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            AppError::Internal(anyhow::anyhow!("password hashing failed"))
        })
}

/// A stored value that is not a PHC string never matches.
pub fn password_matches(plain: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!(error = %e, "stored password hash does not parse");
            false
        }
    }
}

/// Login check. Unknown account and wrong password look the same to the caller.
pub fn check_login(user: Option<User>, plain: &str) -> AppResult<User> {
    match user {
        Some(u) if password_matches(plain, &u.password_hash) => Ok(u),
        _ => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::tests::user;

    fn user_with_password(plain: &str) -> User {
        User {
            password_hash: hash_password(plain).unwrap(),
            ..user(false)
        }
    }

    #[test]
    fn login_accepts_only_the_registered_password() {
        let u = user_with_password("kente-cloth-42");
        let id = u.id;
        assert_eq!(check_login(Some(u.clone()), "kente-cloth-42").unwrap().id, id);
        assert!(matches!(
            check_login(Some(u), "Kente-Cloth-42"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn unknown_account_and_corrupt_hash_read_as_bad_credentials() {
        let err = check_login(None, "whatever1").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid credentials"));

        let corrupt = User {
            password_hash: "plaintext-from-an-old-import".into(),
            ..user(false)
        };
        assert!(matches!(
            check_login(Some(corrupt), "plaintext-from-an-old-import"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn each_hash_is_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn new_password_rules() {
        assert!(check_new_password("longenough", Some("longenough")).is_ok());
        assert!(check_new_password("longenough", None).is_ok());
        assert!(matches!(
            check_new_password("longenough", Some("different1")),
            Err(AppError::Validation(ref m)) if m == "Passwords do not match."
        ));
        assert!(matches!(
            check_new_password("short", None),
            Err(AppError::Validation(ref m)) if m == "Password too short"
        ));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ama@school.edu.gh"));
        assert!(!is_valid_email("ama@school"));
        assert!(!is_valid_email("ama school@x.com"));
        assert!(!is_valid_email(""));
    }
}
