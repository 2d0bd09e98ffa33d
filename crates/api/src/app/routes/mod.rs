use axum::Router;

pub mod auth;
pub mod common;
pub mod projects;
pub mod system;
pub mod tasks;
pub mod users;

/// Router for every endpoint behind the auth middleware.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/projects", projects::router())
        .nest("/tasks", tasks::router())
}
