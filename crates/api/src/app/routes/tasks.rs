use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{patch, post},
};
use chrono::Utc;

use taskdesk_auth::Operation;
use taskdesk_core::{ProjectId, TaskId};

use crate::app::board::NewTask;
use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::routes::common::{json_body, validated_body};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_task).get(list_tasks))
        .route("/:id/status", patch(update_task_status))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateTaskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    crate::authz::require(&services.policy, &ctx, Operation::CreateTask)?;
    let new: NewTask = validated_body(body)?.into();

    if let Some(assignee) = new.assignee {
        services.credentials.profile_by_id(assignee).await?;
    }

    let task = services.board.create_task(new, Utc::now())?;
    Ok(dto::envelope(StatusCode::CREATED, "Task created successfully", task))
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(query): Query<dto::TaskListQuery>,
) -> Result<Response, ApiError> {
    crate::authz::require(&services.policy, &ctx, Operation::ListTasks)?;
    let project = query.project_id.map(|id| id.parse::<ProjectId>()).transpose()?;

    Ok(dto::envelope(
        StatusCode::OK,
        "Tasks fetched successfully",
        services.board.list_tasks(project),
    ))
}

pub async fn update_task_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateTaskStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    crate::authz::require(&services.policy, &ctx, Operation::UpdateTaskStatus)?;
    let id: TaskId = id.parse()?;
    let body = json_body(body)?;

    let task = services.board.update_task_status(id, body.status)?;
    Ok(dto::envelope(StatusCode::OK, "Task status updated successfully", task))
}
