//! Action execution.
//!
//! One executor invocation performs the media-control side effect for a
//! single action, writes the outcome back through the store, and announces
//! it on the broadcast channel: exactly one event per execution, success
//! or failure.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::CalendarProvider;
use crate::database::models::{ActionPatch, ActionType, ScheduledAction};
use crate::database::repositories::ActionRepository;
use crate::database::time::datetime_to_ts;
use crate::media::MediaController;
use crate::notification::{ExecutionEvent, ExecutionEventBroadcaster};

/// Structured outcome of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionResult {
    fn ok(message: impl Into<String>, executed_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: message.into(),
            executed_at,
        }
    }

    fn failed(message: impl Into<String>, executed_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            message: message.into(),
            executed_at,
        }
    }
}

/// Executes scheduled actions against the media-control boundary.
pub struct ActionExecutor {
    store: Arc<dyn ActionRepository>,
    media: Arc<dyn MediaController>,
    calendar: Arc<dyn CalendarProvider>,
    events: ExecutionEventBroadcaster,
}

impl ActionExecutor {
    pub fn new(
        store: Arc<dyn ActionRepository>,
        media: Arc<dyn MediaController>,
        calendar: Arc<dyn CalendarProvider>,
        events: ExecutionEventBroadcaster,
    ) -> Self {
        Self {
            store,
            media,
            calendar,
            events,
        }
    }

    /// Resolve the playback target for an action.
    ///
    /// An explicit event name always wins; a daily action without one
    /// targets the calendar event whose interval contains now.
    async fn resolve_target(&self, action: &ScheduledAction, now: DateTime<Utc>) -> Option<String> {
        if let Some(name) = &action.event_name {
            return Some(name.clone());
        }
        if action.is_daily {
            return self.calendar.current_event(now).await.map(|event| event.name);
        }
        None
    }

    /// Perform the media-control side effect for one action.
    pub async fn execute(&self, action: &ScheduledAction) -> ExecutionResult {
        let now = Utc::now();
        let target = self.resolve_target(action, now).await;

        // A Play without a resolvable target is a reported failure, not a
        // fatal error.
        if action.action_type == ActionType::Play && target.is_none() {
            return ExecutionResult::failed(
                "No playable target: no explicit event name and no calendar event covers now",
                now,
            );
        }

        let outcome = self
            .media
            .control(action.action_type, target.as_deref())
            .await;

        if outcome.success {
            ExecutionResult::ok(outcome.message, now)
        } else {
            ExecutionResult::failed(outcome.message, now)
        }
    }

    /// Execute, persist the outcome, and broadcast exactly one event.
    ///
    /// On success: `last_run = now`, the retry streak resets, and daily
    /// actions get `next_run = now + 24h`. On failure: the retry counter
    /// increments (capped at the budget) and `next_run` stays unchanged.
    pub async fn execute_and_record(&self, action: &ScheduledAction) -> ExecutionResult {
        let result = self.execute(action).await;

        let patch = if result.success {
            ActionPatch {
                last_run: Some(datetime_to_ts(result.executed_at)),
                next_run: action
                    .is_daily
                    .then(|| datetime_to_ts(result.executed_at + Duration::hours(24))),
                retry_count: Some(0),
                ..ActionPatch::default()
            }
        } else {
            ActionPatch {
                retry_count: Some((action.retry_count + 1).min(action.max_retries.max(0))),
                ..ActionPatch::default()
            }
        };

        // A persistence failure must not suppress the broadcast; fall back
        // to the pre-execution state for the event payload.
        let recorded = match self.store.patch(&action.id, patch).await {
            Ok(updated) => updated,
            Err(error) => {
                warn!(
                    action_id = %action.id,
                    error = %error,
                    "Failed to persist execution outcome"
                );
                action.clone()
            }
        };

        if result.success {
            debug!(
                action_id = %recorded.id,
                action_type = recorded.action_type.as_str(),
                "Action executed"
            );
            self.events.publish(ExecutionEvent::Executed {
                action: recorded,
                result: result.clone(),
            });
        } else {
            warn!(
                action_id = %recorded.id,
                action_type = recorded.action_type.as_str(),
                error = %result.message,
                retry_count = recorded.retry_count,
                "Action execution failed"
            );
            self.events.publish(ExecutionEvent::Failed {
                action: recorded,
                error: result.message.clone(),
            });
        }

        result
    }
}
