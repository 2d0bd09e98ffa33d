//! Authentication/authorization error taxonomy.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Structured field → message map for input validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Records a message for `field`; the first message per field wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let message = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{field} is invalid"));
            out.insert(field.to_string(), message);
        }
        out
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "{}", fields.join(", "))
    }
}

/// Every failure the authentication core can report.
///
/// Messages of the security-decision variants are fixed and generic: they
/// must never say which part of a credential or token was wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("username is already taken")]
    DuplicateUsername,

    #[error("email is already taken")]
    DuplicateEmail,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid token")]
    TokenMalformed,

    #[error("invalid token")]
    TokenSignatureInvalid,

    #[error("invalid token")]
    TokenExpired,

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("access denied")]
    AccessDenied,

    /// Startup misconfiguration: a role is referenced but not provisioned.
    #[error("role '{0}' is not configured")]
    RoleNotConfigured(String),

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("user not found")]
    UserNotFound,

    /// Storage or hashing failure; the detail is for server-side logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}
