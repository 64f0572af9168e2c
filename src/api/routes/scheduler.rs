//! Scheduler control routes: reinitialize, health, debug.

use axum::{Json, Router, extract::State, routing::{get, post}};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::ReconcileResponse;
use crate::api::server::AppState;
use crate::scheduler::{DebugSnapshot, SchedulerHealth};

/// Create the scheduler router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reinitialize", post(reinitialize))
        .route("/health", get(scheduler_health))
        .route("/debug", get(scheduler_debug))
}

#[utoipa::path(
    post,
    path = "/api/scheduler/reinitialize",
    tag = "scheduler",
    responses(
        (status = 200, description = "Timer set rebuilt from the store", body = ReconcileResponse),
        (status = 503, description = "Scheduler stopped", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn reinitialize(State(state): State<AppState>) -> ApiResult<Json<ReconcileResponse>> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Scheduler not available"))?;

    let summary = scheduler.reinitialize().await.map_err(ApiError::from)?;
    Ok(Json(ReconcileResponse {
        is_initialized: scheduler.is_initialized(),
        summary,
    }))
}

#[utoipa::path(
    get,
    path = "/api/scheduler/health",
    tag = "scheduler",
    responses(
        (status = 200, description = "Scheduler health summary", body = SchedulerHealth)
    )
)]
pub async fn scheduler_health(State(state): State<AppState>) -> ApiResult<Json<SchedulerHealth>> {
    let reporter = state
        .health_reporter
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Health reporter not available"))?;

    let health = reporter.health().await.map_err(ApiError::from)?;
    Ok(Json(health))
}

#[utoipa::path(
    get,
    path = "/api/scheduler/debug",
    tag = "scheduler",
    responses(
        (status = 200, description = "Live registry snapshot with ghost detection", body = DebugSnapshot)
    )
)]
pub async fn scheduler_debug(State(state): State<AppState>) -> ApiResult<Json<DebugSnapshot>> {
    let reporter = state
        .health_reporter
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Health reporter not available"))?;

    let snapshot = reporter.debug().await.map_err(ApiError::from)?;
    Ok(Json(snapshot))
}
