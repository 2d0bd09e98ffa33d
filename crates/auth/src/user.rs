//! User accounts and the storage boundary they live behind.
//!
//! Storage is abstracted by [`UserStore`]; the crate ships an in-memory
//! implementation (see [`crate::store`]) and `taskdesk-infra` a Postgres one.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

use taskdesk_core::UserId;

use crate::{HashedPassword, Role};

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A stored user account.
///
/// # Invariants
/// - `username` and `email` are unique across all users and never change.
/// - `roles` is never empty.
/// - `enabled` and `roles` change only through administrator actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: HashedPassword,
    pub enabled: bool,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            enabled: self.enabled,
            roles: self.roles.clone(),
        }
    }
}

/// The safe, client-facing view of a [`User`]. Carries no password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub enabled: bool,
    pub roles: BTreeSet<Role>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration input
// ─────────────────────────────────────────────────────────────────────────────

/// Self-service registration request.
#[derive(Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(
        custom(function = "not_blank"),
        length(min = 3, max = 50, message = "Username must be between 3 and 50 characters")
    )]
    pub username: String,

    #[validate(
        custom(function = "not_blank"),
        email(message = "Email must be a valid address"),
        length(max = 100, message = "Email must be at most 100 characters")
    )]
    pub email: String,

    #[validate(length(
        min = 5,
        max = 128,
        message = "Password must be between 5 and 128 characters"
    ))]
    pub password: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Trimmed username/email; the password is taken verbatim.
    pub(crate) fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage boundary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("username is already taken")]
    UsernameTaken,

    #[error("email is already taken")]
    EmailTaken,

    #[error("user not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence for user accounts.
///
/// `insert` must enforce username/email uniqueness atomically: two racing
/// inserts of the same username resolve to exactly one success, and the
/// loser gets `UsernameTaken` (or `EmailTaken`). When both collide the
/// username wins.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// All users, oldest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn set_roles(&self, id: UserId, roles: BTreeSet<Role>) -> Result<User, StoreError>;

    async fn set_enabled(&self, id: UserId, enabled: bool) -> Result<User, StoreError>;

    async fn set_password_hash(&self, id: UserId, hash: HashedPassword) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_errors(reg: &Registration) -> Vec<String> {
        match reg.validate() {
            Ok(()) => Vec::new(),
            Err(e) => {
                let mut fields: Vec<String> =
                    e.field_errors().keys().map(|k| k.to_string()).collect();
                fields.sort();
                fields
            }
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(field_errors(&Registration::new("alice", "alice@x.com", "pw123")).is_empty());
    }

    #[test]
    fn blank_username_is_rejected() {
        assert_eq!(
            field_errors(&Registration::new("   ", "alice@x.com", "pw123")),
            vec!["username"]
        );
    }

    #[test]
    fn every_bad_field_is_reported() {
        let fields = field_errors(&Registration::new("", "not-an-email", "pw"));
        assert_eq!(fields, vec!["email", "password", "username"]);
    }

    #[test]
    fn debug_redacts_password() {
        let printed = format!("{:?}", Registration::new("alice", "alice@x.com", "pw123"));
        assert!(!printed.contains("pw123"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn profile_omits_password_hash() {
        let user = User {
            id: UserId::new(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: HashedPassword::from_phc("$argon2id$v=19$secret"),
            enabled: true,
            roles: BTreeSet::from([Role::Employee]),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["roles"], serde_json::json!(["EMPLOYEE"]));
        assert!(!json.to_string().contains("argon2"));
    }
}
