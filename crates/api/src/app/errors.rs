use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use taskdesk_auth::{AuthError, FieldErrors};
use taskdesk_core::DomainError;

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Domain(DomainError),
    /// Field-level input validation on a request body.
    Validation(FieldErrors),
    /// Request body or path that could not be decoded at all.
    BadRequest(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => auth_error_to_response(err),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Validation(fields) => json_validation_error(fields),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        }
    }
}

/// Security failures carry fixed messages; nothing about which check failed
/// reaches the client.
pub fn auth_error_to_response(err: AuthError) -> Response {
    match err {
        AuthError::DuplicateUsername => {
            json_error(StatusCode::CONFLICT, "duplicate_username", "username is already taken")
        }
        AuthError::DuplicateEmail => {
            json_error(StatusCode::CONFLICT, "duplicate_email", "email is already taken")
        }
        AuthError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid username or password",
        ),
        AuthError::TokenMalformed
        | AuthError::TokenSignatureInvalid
        | AuthError::TokenExpired
        | AuthError::AuthenticationRequired => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required")
        }
        AuthError::AccessDenied => json_error(StatusCode::FORBIDDEN, "forbidden", "access denied"),
        AuthError::Validation(fields) => json_validation_error(fields),
        AuthError::UserNotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        AuthError::RoleNotConfigured(role) => {
            tracing::error!(role = %role, "role referenced at request time is not configured");
            internal_error()
        }
        AuthError::Internal(detail) => {
            tracing::error!(error = %detail, "internal error");
            internal_error()
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_validation_error(fields: FieldErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "success": false,
            "error": "validation_error",
            "message": "Validation Failed",
            "fields": fields,
        })),
    )
        .into_response()
}

fn internal_error() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}
