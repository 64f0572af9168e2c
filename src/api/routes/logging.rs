//! Logging configuration routes.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{LogFilterResponse, LogModule, UpdateLogFilterRequest};
use crate::api::server::AppState;
use crate::logging::available_modules;

/// Create the logging router.
pub fn router() -> Router<AppState> {
    Router::new().route("/filter", get(get_filter).put(set_filter))
}

#[utoipa::path(
    get,
    path = "/api/logging/filter",
    tag = "logging",
    responses(
        (status = 200, description = "Active log filter and known modules", body = LogFilterResponse)
    )
)]
pub async fn get_filter(State(state): State<AppState>) -> ApiResult<Json<LogFilterResponse>> {
    let logging = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging config not available"))?;

    Ok(Json(LogFilterResponse {
        filter: logging.get_filter(),
        modules: available_modules()
            .into_iter()
            .map(|(name, description)| LogModule {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/logging/filter",
    tag = "logging",
    request_body = UpdateLogFilterRequest,
    responses(
        (status = 200, description = "Filter updated", body = LogFilterResponse),
        (status = 400, description = "Invalid directive", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn set_filter(
    State(state): State<AppState>,
    Json(request): Json<UpdateLogFilterRequest>,
) -> ApiResult<Json<LogFilterResponse>> {
    let logging = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging config not available"))?;

    logging
        .set_filter(&request.directive)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(Json(LogFilterResponse {
        filter: logging.get_filter(),
        modules: available_modules()
            .into_iter()
            .map(|(name, description)| LogModule {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    }))
}
