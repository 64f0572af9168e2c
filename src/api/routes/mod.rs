//! API route modules.
//!
//! Organizes routes by resource type.

pub mod actions;
pub mod calendar;
pub mod health;
pub mod logging;
pub mod scheduler;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;
use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/actions", actions::router())
        .nest("/api/scheduler", scheduler::router())
        .nest("/api/calendar", calendar::router())
        .nest("/api/logging", logging::router())
        .nest("/health", health::router())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
