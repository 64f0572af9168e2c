//! Media-control boundary.
//!
//! The actual player integration lives behind [`MediaController`]; the
//! engine only sees a structured success/failure outcome. Target matching
//! and name normalization belong to the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::database::models::ActionType;

/// Outcome of one media-control invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaControlResult {
    pub success: bool,
    pub message: String,
}

impl MediaControlResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Media player control boundary.
#[async_trait]
pub trait MediaController: Send + Sync {
    /// Apply `action` to the player. `target` is a playlist/file name for
    /// Play; Pause and Stop act on current playback when it is absent.
    async fn control(&self, action: ActionType, target: Option<&str>) -> MediaControlResult;
}

/// Controller that only logs the requested transition and reports success.
///
/// Used when no player integration is configured, and as the wiring default
/// in tests.
#[derive(Debug, Default, Clone)]
pub struct LogOnlyMediaController;

#[async_trait]
impl MediaController for LogOnlyMediaController {
    async fn control(&self, action: ActionType, target: Option<&str>) -> MediaControlResult {
        tracing::info!(
            action = action.as_str(),
            target = target.unwrap_or("<current>"),
            "Media control (log-only)"
        );
        MediaControlResult::ok(format!(
            "{} {}",
            action.as_str(),
            target.unwrap_or("current playback")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_only_controller_succeeds() {
        let controller = LogOnlyMediaController;
        let result = controller
            .control(ActionType::Play, Some("morning show"))
            .await;
        assert!(result.success);
        assert!(result.message.contains("morning show"));

        let result = controller.control(ActionType::Stop, None).await;
        assert!(result.success);
    }
}
