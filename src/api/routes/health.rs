//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::api::error::ApiResult;
use crate::api::models::{ComponentHealth, HealthResponse};
use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let uptime = state.start_time.elapsed().as_secs();

    let mut components = Vec::new();
    let mut status = "healthy";

    if let Some(reporter) = &state.health_reporter {
        match reporter.health().await {
            Ok(health) => {
                let scheduler_status = if health.is_initialized {
                    "healthy"
                } else {
                    status = "degraded";
                    "initializing"
                };
                components.push(ComponentHealth {
                    name: "scheduler".to_string(),
                    status: scheduler_status.to_string(),
                    message: None,
                });
                components.push(ComponentHealth {
                    name: "database".to_string(),
                    status: "healthy".to_string(),
                    message: None,
                });
            }
            Err(e) => {
                status = "unhealthy";
                components.push(ComponentHealth {
                    name: "database".to_string(),
                    status: "unhealthy".to_string(),
                    message: Some(e.to_string()),
                });
            }
        }
    }

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
        components,
    }))
}

/// Readiness check - is the service ready to accept traffic?
/// Returns HTTP 200 once the scheduler has completed its first
/// reconciliation, HTTP 503 before that.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match &state.scheduler {
        Some(scheduler) if scheduler.is_initialized() => (StatusCode::OK, "ready"),
        Some(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
        // Fallback for testing without full service setup
        None => (StatusCode::OK, "ready"),
    }
}

/// Liveness check - is the service alive?
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}
