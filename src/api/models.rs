//! API request/response models.
//!
//! Scheduled-action payloads reuse the store's input types
//! ([`crate::database::models::ActionDraft`] and friends); this module holds
//! the DTOs that exist only at the API surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::scheduler::ReconcileSummary;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}

/// Health of a single component.
#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response to a forced reinitialization.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub is_initialized: bool,
    pub summary: ReconcileSummary,
}

/// Current log filter configuration.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogFilterResponse {
    /// Active filter directive (e.g. "playcue=info,sqlx=warn")
    pub filter: String,
    /// Known module targets and their descriptions.
    pub modules: Vec<LogModule>,
}

/// A known logging module.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogModule {
    pub name: String,
    pub description: String,
}

/// Request to change the log filter.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLogFilterRequest {
    /// New filter directive (e.g. "playcue=debug,sqlx=warn")
    pub directive: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 3600,
            components: vec![ComponentHealth {
                name: "scheduler".to_string(),
                status: "healthy".to_string(),
                message: None,
            }],
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("scheduler"));
        // None message is omitted entirely.
        assert!(!json.contains("message"));
    }
}
