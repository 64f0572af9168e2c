//! Read-only calendar routes.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::calendar::CalendarEvent;

/// Create the calendar router.
pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(list_events))
}

#[utoipa::path(
    get,
    path = "/api/calendar/events",
    tag = "calendar",
    responses(
        (status = 200, description = "All known calendar events", body = [CalendarEvent])
    )
)]
pub async fn list_events(State(state): State<AppState>) -> ApiResult<Json<Vec<CalendarEvent>>> {
    let calendar = state
        .calendar
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Calendar not available"))?;

    Ok(Json(calendar.list_events().await))
}
