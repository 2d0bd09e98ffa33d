use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use taskdesk_auth::{Operation, Registration};

use crate::app::errors::ApiError;
use crate::app::routes::common::json_body;
use crate::app::services::AppServices;
use crate::app::dto;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<Response, ApiError> {
    let registration = json_body(body)?;
    let user = services.credentials.register(registration).await?;

    Ok(dto::envelope(
        StatusCode::CREATED,
        "User registered successfully!",
        user.profile(),
    ))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_body(body)?;
    let principal = services.credentials.verify(&body.username, &body.password).await?;
    let issued = services.issuer.issue(&principal)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "Login Successful",
        dto::LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_in: services.issuer.ttl().num_seconds(),
        },
    ))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<Response, ApiError> {
    let principal = crate::authz::require(&services.policy, &ctx, Operation::ViewProfile)?;
    let profile = services.credentials.profile(&principal.username).await?;

    Ok(dto::envelope(StatusCode::OK, "User fetched", profile))
}
