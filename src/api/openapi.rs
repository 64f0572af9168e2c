//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::api::error::ApiErrorResponse;
use crate::api::models::{
    ComponentHealth, HealthResponse, LogFilterResponse, LogModule, ReconcileResponse,
    UpdateLogFilterRequest,
};
use crate::calendar::CalendarEvent;
use crate::database::models::{ActionDraft, ActionPatch, ActionType, ActionUpdate, ScheduledAction};
use crate::scheduler::health::{DebugEntry, DebugSnapshot, SchedulerHealth};
use crate::scheduler::{ReconcileSummary, ScheduleKind};

/// OpenAPI documentation for the playcue API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "playcue API",
        description = "Control surface for the time-triggered media control scheduler",
    ),
    paths(
        crate::api::routes::actions::create_action,
        crate::api::routes::actions::list_actions,
        crate::api::routes::actions::get_action,
        crate::api::routes::actions::update_action,
        crate::api::routes::actions::patch_action,
        crate::api::routes::actions::delete_action,
        crate::api::routes::actions::pause_action,
        crate::api::routes::actions::resume_action,
        crate::api::routes::scheduler::reinitialize,
        crate::api::routes::scheduler::scheduler_health,
        crate::api::routes::scheduler::scheduler_debug,
        crate::api::routes::calendar::list_events,
        crate::api::routes::logging::get_filter,
        crate::api::routes::logging::set_filter,
    ),
    components(schemas(
        ScheduledAction,
        ActionType,
        ActionDraft,
        ActionUpdate,
        ActionPatch,
        CalendarEvent,
        SchedulerHealth,
        DebugSnapshot,
        DebugEntry,
        ScheduleKind,
        ReconcileSummary,
        ReconcileResponse,
        HealthResponse,
        ComponentHealth,
        LogFilterResponse,
        LogModule,
        UpdateLogFilterRequest,
        ApiErrorResponse,
    )),
    tags(
        (name = "actions", description = "Scheduled action management"),
        (name = "scheduler", description = "Scheduler control and visibility"),
        (name = "calendar", description = "Calendar boundary, read-only"),
        (name = "logging", description = "Runtime logging configuration"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generates() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("/api/actions"));
        assert!(json.contains("/api/scheduler/reinitialize"));
        assert!(json.contains("ScheduledAction"));
    }
}
