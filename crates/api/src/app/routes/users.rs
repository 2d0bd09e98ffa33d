use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};
use tracing::info;

use taskdesk_auth::Operation;
use taskdesk_core::UserId;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::routes::common::json_body;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id/roles", put(assign_roles))
        .route("/:id/enable", post(enable_user))
        .route("/:id/disable", post(disable_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<Response, ApiError> {
    crate::authz::require(&services.policy, &ctx, Operation::ListUsers)?;
    let users = services.credentials.list_profiles().await?;

    Ok(dto::envelope(StatusCode::OK, "Users fetched successfully", users))
}

pub async fn assign_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::AssignRolesRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let admin = crate::authz::require(&services.policy, &ctx, Operation::ManageUsers)?;
    let id: UserId = id.parse()?;
    let body = json_body(body)?;

    let profile = services.credentials.assign_roles(id, &body.roles).await?;
    info!(admin = %admin.username, user_id = %id, "roles assigned");

    Ok(dto::envelope(StatusCode::OK, "Roles updated successfully", profile))
}

pub async fn enable_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_enabled(services, ctx, id, true).await
}

pub async fn disable_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    set_enabled(services, ctx, id, false).await
}

async fn set_enabled(
    services: Arc<AppServices>,
    ctx: PrincipalContext,
    id: String,
    enabled: bool,
) -> Result<Response, ApiError> {
    let admin = crate::authz::require(&services.policy, &ctx, Operation::ManageUsers)?;
    let id: UserId = id.parse()?;

    let profile = services.credentials.set_enabled(id, enabled).await?;
    info!(admin = %admin.username, user_id = %id, enabled, "account status changed");

    let message = if enabled { "User enabled" } else { "User disabled" };
    Ok(dto::envelope(StatusCode::OK, message, profile))
}
