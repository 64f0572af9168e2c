//! Execution events.
//!
//! Every execution, success or failure, produces exactly one event on this
//! channel. Zero subscribers is a valid, silent no-op.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::database::models::ScheduledAction;
use crate::scheduler::executor::ExecutionResult;

/// Events broadcast after each scheduled-action execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// The action executed successfully; carries the updated action state.
    Executed {
        action: ScheduledAction,
        result: ExecutionResult,
    },
    /// The execution failed; carries the action state and the error message.
    #[serde(rename = "error")]
    Failed {
        action: ScheduledAction,
        error: String,
    },
}

impl ExecutionEvent {
    /// Get a description of the event for logging.
    pub fn description(&self) -> String {
        match self {
            Self::Executed { action, .. } => {
                format!("Executed {} action {}", action.action_type, action.id)
            }
            Self::Failed { action, error } => {
                format!(
                    "Failed {} action {}: {}",
                    action.action_type, action.id, error
                )
            }
        }
    }

    /// The id of the action this event concerns.
    pub fn action_id(&self) -> &str {
        match self {
            Self::Executed { action, .. } | Self::Failed { action, .. } => &action.id,
        }
    }
}

/// Default channel capacity for execution events.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcaster for execution events.
///
/// Uses tokio's broadcast channel to distribute events to multiple
/// subscribers.
#[derive(Clone)]
pub struct ExecutionEventBroadcaster {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl ExecutionEventBroadcaster {
    /// Create a new broadcaster with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new broadcaster with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to execution events.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// Publish an execution event.
    ///
    /// Returns the number of receivers that received the event; 0 when
    /// there are no active subscribers.
    pub fn publish(&self, event: ExecutionEvent) -> usize {
        tracing::debug!("Publishing execution event: {}", event.description());
        // send() returns Err when there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ExecutionEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ActionType;
    use chrono::Utc;

    fn action() -> ScheduledAction {
        ScheduledAction {
            id: "a1".to_string(),
            event_id: None,
            event_name: None,
            action_type: ActionType::Play,
            time: "09:00:00".to_string(),
            date: None,
            is_daily: true,
            is_active: true,
            timezone: "UTC".to_string(),
            last_run: None,
            next_run: None,
            max_retries: 3,
            retry_count: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let broadcaster = ExecutionEventBroadcaster::new();
        let delivered = broadcaster.publish(ExecutionEvent::Failed {
            action: action(),
            error: "no target".to_string(),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let broadcaster = ExecutionEventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let delivered = broadcaster.publish(ExecutionEvent::Executed {
            action: action(),
            result: ExecutionResult {
                success: true,
                message: "ok".to_string(),
                executed_at: Utc::now(),
            },
        });
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.action_id(), "a1");
        assert!(matches!(event, ExecutionEvent::Executed { .. }));
    }
}
