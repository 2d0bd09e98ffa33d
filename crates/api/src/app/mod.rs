//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and auth service wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and the success envelope
//! - `errors.rs`: consistent error responses
//! - `board.rs`: in-memory projects and tasks

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::middleware;

pub mod board;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, BootstrapError, build_services, build_services_with};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        validator: services.validator.clone(),
    };

    // Every API route gets a PrincipalContext; each handler gates itself.
    let api = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
}
