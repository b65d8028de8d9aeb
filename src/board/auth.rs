//! Password digests and bearer-session management.
//!
//! Sessions are opaque server-side tokens with a TTL, stored in the
//! `sessions` table. Passwords are stored as `salt$hex` salted SHA-256
//! digests; the plaintext never reaches the storage layer.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::db::{BoardDb, sql_datetime};
use super::models::User;
use crate::errors::BoardError;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

const MIN_PASSWORD_LEN: usize = 6;

/// Salted SHA-256 digest of a password, stored as `salt$hex`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest_with_salt(&salt, password))
}

pub fn verify_password(stored: &str, candidate: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, hex)) => digest_with_salt(salt, candidate) == hex,
        None => false,
    }
}

fn digest_with_salt(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue a fresh opaque bearer token for `user_id`.
pub fn issue_session(db: &BoardDb, user_id: i64, ttl_hours: i64) -> Result<String, BoardError> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let expires_at = sql_datetime(Utc::now() + Duration::hours(ttl_hours));
    db.create_session(user_id, &token, &expires_at)?;
    Ok(token)
}

/// Register a user and log them straight in, returning `(user, token)`.
pub fn signup(
    db: &BoardDb,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    ttl_hours: i64,
) -> Result<(User, String), BoardError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(BoardError::BadRequest("Email is invalid".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(BoardError::BadRequest(format!(
            "Password is too short (minimum is {MIN_PASSWORD_LEN} characters)"
        )));
    }
    let user = db.create_user(email, &hash_password(password), first_name, last_name)?;
    let token = issue_session(db, user.id, ttl_hours)?;
    Ok((user, token))
}

/// Exchange email + password for a bearer token.
pub fn login(
    db: &BoardDb,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> Result<String, BoardError> {
    match db.credentials_for(email.trim())? {
        Some((user_id, digest)) if verify_password(&digest, password) => {
            issue_session(db, user_id, ttl_hours)
        }
        _ => Err(BoardError::InvalidCredentials),
    }
}

/// Resolve a bearer token to its user, or fail with `NotAuthenticated`.
pub fn authenticate(db: &BoardDb, token: &str) -> Result<User, BoardError> {
    db.user_for_token(token)?.ok_or(BoardError::NotAuthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_verifies_and_rejects() {
        let stored = hash_password("hunter42");
        assert!(verify_password(&stored, "hunter42"));
        assert!(!verify_password(&stored, "hunter43"));
        assert!(!verify_password("garbage-without-separator", "hunter42"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("hunter42");
        let b = hash_password("hunter42");
        assert_ne!(a, b);
    }

    #[test]
    fn signup_then_login_round_trip() {
        let db = BoardDb::new_in_memory().unwrap();
        let (user, token) =
            signup(&db, "ada@example.com", "hunter42", "Ada", "Lovelace", 24).unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(authenticate(&db, &token).unwrap().id, user.id);

        let token2 = login(&db, "ada@example.com", "hunter42", 24).unwrap();
        assert_ne!(token, token2);
        assert_eq!(authenticate(&db, &token2).unwrap().id, user.id);
    }

    #[test]
    fn login_with_wrong_password_fails() {
        let db = BoardDb::new_in_memory().unwrap();
        signup(&db, "ada@example.com", "hunter42", "Ada", "L", 24).unwrap();
        let err = login(&db, "ada@example.com", "wrong", 24).unwrap_err();
        assert!(matches!(err, BoardError::InvalidCredentials));
        let err = login(&db, "nobody@example.com", "hunter42", 24).unwrap_err();
        assert!(matches!(err, BoardError::InvalidCredentials));
    }

    #[test]
    fn signup_validates_inputs() {
        let db = BoardDb::new_in_memory().unwrap();
        let err = signup(&db, "not-an-email", "hunter42", "A", "B", 24).unwrap_err();
        assert!(matches!(err, BoardError::BadRequest(_)));
        let err = signup(&db, "ada@example.com", "pw", "A", "B", 24).unwrap_err();
        assert!(matches!(err, BoardError::BadRequest(_)));
    }

    #[test]
    fn unknown_token_is_not_authenticated() {
        let db = BoardDb::new_in_memory().unwrap();
        let err = authenticate(&db, "no-such-token").unwrap_err();
        assert!(matches!(err, BoardError::NotAuthenticated));
    }
}
