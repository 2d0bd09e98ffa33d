use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use taskdesk_core::{ProjectId, UserId};

use crate::app::board::{NewProject, NewTask, TaskPriority, TaskStatus};

// -------------------------
// Envelope
// -------------------------

/// `{ "success": true, "message": ..., "data": ... }`
pub fn envelope(status: StatusCode, message: &str, data: impl Serialize) -> Response {
    (
        status,
        axum::Json(json!({
            "success": true,
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

// -------------------------
// Auth
// -------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

// -------------------------
// Users
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AssignRolesRequest {
    pub roles: Vec<String>,
}

// -------------------------
// Projects / tasks
// -------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

impl From<CreateProjectRequest> for NewProject {
    fn from(req: CreateProjectRequest) -> Self {
        NewProject {
            name: req.name,
            description: req.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: ProjectId,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    pub deadline: Option<DateTime<Utc>>,

    pub assignee_id: Option<UserId>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            project_id: req.project_id,
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            deadline: req.deadline,
            assignee: req.assignee_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub project_id: Option<String>,
}
