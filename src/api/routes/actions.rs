//! Scheduled action management routes.
//!
//! Every mutation funnels through the scheduler so the live timer set is
//! rebuilt before the response returns.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::database::models::{ActionDraft, ActionPatch, ActionUpdate, ScheduledAction};

/// Create the actions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_action))
        .route("/", get(list_actions))
        .route("/{id}", get(get_action))
        .route("/{id}", put(update_action))
        .route("/{id}", patch(patch_action))
        .route("/{id}", delete(delete_action))
        .route("/{id}/pause", post(pause_action))
        .route("/{id}/resume", post(resume_action))
}

#[utoipa::path(
    post,
    path = "/api/actions",
    tag = "actions",
    request_body = ActionDraft,
    responses(
        (status = 201, description = "Action created and scheduled", body = ScheduledAction),
        (status = 422, description = "Validation error", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn create_action(
    State(state): State<AppState>,
    Json(draft): Json<ActionDraft>,
) -> ApiResult<(StatusCode, Json<ScheduledAction>)> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Scheduler not available"))?;

    let action = scheduler.schedule(draft).await.map_err(ApiError::from)?;
    Ok((StatusCode::CREATED, Json(action)))
}

#[utoipa::path(
    get,
    path = "/api/actions",
    tag = "actions",
    responses(
        (status = 200, description = "All scheduled actions", body = [ScheduledAction])
    )
)]
pub async fn list_actions(State(state): State<AppState>) -> ApiResult<Json<Vec<ScheduledAction>>> {
    let repository = state
        .action_repository
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Action store not available"))?;

    let actions = repository.list().await.map_err(ApiError::from)?;
    Ok(Json(actions))
}

#[utoipa::path(
    get,
    path = "/api/actions/{id}",
    tag = "actions",
    params(("id" = String, Path, description = "Action id")),
    responses(
        (status = 200, description = "The scheduled action", body = ScheduledAction),
        (status = 404, description = "Action not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn get_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledAction>> {
    let repository = state
        .action_repository
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Action store not available"))?;

    let action = repository.get(&id).await.map_err(ApiError::from)?;
    Ok(Json(action))
}

#[utoipa::path(
    put,
    path = "/api/actions/{id}",
    tag = "actions",
    params(("id" = String, Path, description = "Action id")),
    request_body = ActionUpdate,
    responses(
        (status = 200, description = "Action updated and rescheduled", body = ScheduledAction),
        (status = 404, description = "Action not found", body = crate::api::error::ApiErrorResponse),
        (status = 422, description = "Validation error", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn update_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ActionUpdate>,
) -> ApiResult<Json<ScheduledAction>> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Scheduler not available"))?;

    let action = scheduler
        .update_action(&id, update)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(action))
}

#[utoipa::path(
    patch,
    path = "/api/actions/{id}",
    tag = "actions",
    params(("id" = String, Path, description = "Action id")),
    request_body = ActionPatch,
    responses(
        (status = 200, description = "Action patched and rescheduled", body = ScheduledAction),
        (status = 404, description = "Action not found", body = crate::api::error::ApiErrorResponse),
        (status = 422, description = "Validation error", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn patch_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionPatch>,
) -> ApiResult<Json<ScheduledAction>> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Scheduler not available"))?;

    let action = scheduler
        .patch_action(&id, body)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(action))
}

#[utoipa::path(
    delete,
    path = "/api/actions/{id}",
    tag = "actions",
    params(("id" = String, Path, description = "Action id")),
    responses(
        (status = 204, description = "Action deleted; its timer can no longer fire"),
        (status = 404, description = "Action not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn delete_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Scheduler not available"))?;

    scheduler.remove(&id).await.map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/actions/{id}/pause",
    tag = "actions",
    params(("id" = String, Path, description = "Action id")),
    responses(
        (status = 200, description = "Action paused", body = ScheduledAction),
        (status = 404, description = "Action not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn pause_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledAction>> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Scheduler not available"))?;

    let action = scheduler.pause(&id).await.map_err(ApiError::from)?;
    Ok(Json(action))
}

#[utoipa::path(
    post,
    path = "/api/actions/{id}/resume",
    tag = "actions",
    params(("id" = String, Path, description = "Action id")),
    responses(
        (status = 200, description = "Action resumed and re-armed", body = ScheduledAction),
        (status = 404, description = "Action not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn resume_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledAction>> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Scheduler not available"))?;

    let action = scheduler.resume(&id).await.map_err(ApiError::from)?;
    Ok(Json(action))
}
