use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use taskdesk_auth::Operation;
use taskdesk_core::{ProjectId, UserId};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::routes::common::validated_body;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_project).get(list_projects))
        .route("/:id", get(get_project))
        .route("/:id/members/:user_id", post(add_member))
}

pub async fn create_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateProjectRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = crate::authz::require(&services.policy, &ctx, Operation::CreateProject)?;
    let body = validated_body(body)?;

    let project = services
        .board
        .create_project(body.into(), &principal.username, Utc::now())?;

    Ok(dto::envelope(StatusCode::CREATED, "Project created successfully", project))
}

pub async fn list_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<Response, ApiError> {
    crate::authz::require(&services.policy, &ctx, Operation::ListProjects)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "Projects fetched successfully",
        services.board.list_projects(),
    ))
}

pub async fn get_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    crate::authz::require(&services.policy, &ctx, Operation::GetProject)?;
    let id: ProjectId = id.parse()?;

    let project = services.board.get_project(id)?;
    Ok(dto::envelope(StatusCode::OK, "Project fetched successfully", project))
}

pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    crate::authz::require(&services.policy, &ctx, Operation::AddProjectMember)?;
    let id: ProjectId = id.parse()?;
    let user_id: UserId = user_id.parse()?;

    // 404 for an unknown project before looking up the user.
    services.board.get_project(id)?;
    services.credentials.profile_by_id(user_id).await?;

    let project = services.board.add_member(id, user_id)?;
    Ok(dto::envelope(StatusCode::OK, "Member added successfully", project))
}
