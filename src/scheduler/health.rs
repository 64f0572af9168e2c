//! Scheduler health and debug snapshots.
//!
//! Derives operational visibility from the scheduler and the store; used by
//! the control surface only, never by the engine itself.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::database::repositories::ActionRepository;
use crate::Result;

use super::registry::ScheduleKind;
use super::service::Scheduler;

/// Health summary of the scheduling engine.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulerHealth {
    /// True once the first reconciliation has succeeded since process
    /// start (or the last reinitialize).
    pub is_initialized: bool,
    /// Actions in the store with `is_active != false`.
    pub active_schedules: usize,
    /// Armed registry entries.
    pub scheduled_entries: usize,
    /// Actions whose retry budget is exhausted.
    pub failed_actions: usize,
    pub uptime_secs: u64,
}

/// One armed entry in the debug snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebugEntry {
    pub schedule_id: String,
    pub action_id: String,
    pub kind: ScheduleKind,
    pub next_fire_at: DateTime<Utc>,
    /// Whether a timer task handle is currently held.
    pub timer_held: bool,
    /// Armed, but the backing action no longer exists or is inactive.
    pub ghost: bool,
}

/// Full debug snapshot of the live registry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebugSnapshot {
    pub is_initialized: bool,
    pub entries: Vec<DebugEntry>,
    pub ghost_count: usize,
}

/// Derives health/debug snapshots from Scheduler + registry state.
pub struct HealthReporter {
    scheduler: Arc<Scheduler>,
    store: Arc<dyn ActionRepository>,
}

impl HealthReporter {
    pub fn new(scheduler: Arc<Scheduler>, store: Arc<dyn ActionRepository>) -> Self {
        Self { scheduler, store }
    }

    /// Health summary.
    pub async fn health(&self) -> Result<SchedulerHealth> {
        let actions = self.store.list().await?;
        Ok(SchedulerHealth {
            is_initialized: self.scheduler.is_initialized(),
            active_schedules: actions.iter().filter(|a| a.is_active).count(),
            scheduled_entries: self.scheduler.entry_count(),
            failed_actions: actions.iter().filter(|a| a.is_failed()).count(),
            uptime_secs: self.scheduler.uptime().as_secs(),
        })
    }

    /// Debug snapshot enumerating every live entry, flagging ghosts whose
    /// backing action is gone or inactive.
    pub async fn debug(&self) -> Result<DebugSnapshot> {
        let actions = self.store.list().await?;
        let live: HashSet<&str> = actions
            .iter()
            .filter(|a| a.is_active)
            .map(|a| a.id.as_str())
            .collect();

        let entries: Vec<DebugEntry> = self
            .scheduler
            .registry_snapshot()
            .into_iter()
            .map(|entry| {
                let ghost = !live.contains(entry.action_id.as_str());
                DebugEntry {
                    schedule_id: entry.schedule_id,
                    action_id: entry.action_id,
                    kind: entry.kind,
                    next_fire_at: entry.scheduled_at,
                    timer_held: entry.timer_held,
                    ghost,
                }
            })
            .collect();

        let ghost_count = entries.iter().filter(|e| e.ghost).count();
        Ok(DebugSnapshot {
            is_initialized: self.scheduler.is_initialized(),
            entries,
            ghost_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;
    use crate::database::models::{ActionDraft, ActionPatch, ActionType};
    use crate::database::repositories::SqlxActionRepository;
    use crate::media::LogOnlyMediaController;
    use crate::notification::ExecutionEventBroadcaster;
    use crate::scheduler::executor::ActionExecutor;
    use chrono_tz::UTC;
    use tokio_util::sync::CancellationToken;

    async fn setup() -> (Arc<Scheduler>, Arc<SqlxActionRepository>, HealthReporter) {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let store = Arc::new(SqlxActionRepository::new(pool.clone(), pool, UTC));
        let executor = Arc::new(ActionExecutor::new(
            store.clone(),
            Arc::new(LogOnlyMediaController),
            Arc::new(InMemoryCalendar::new()),
            ExecutionEventBroadcaster::new(),
        ));
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            executor,
            UTC,
            CancellationToken::new(),
        ));
        let reporter = HealthReporter::new(scheduler.clone(), store.clone());
        (scheduler, store, reporter)
    }

    fn daily_draft(time: &str) -> ActionDraft {
        ActionDraft {
            event_id: None,
            event_name: Some("show".to_string()),
            action_type: ActionType::Play,
            time: time.to_string(),
            date: None,
            is_daily: true,
            is_active: None,
            timezone: None,
            max_retries: None,
            next_run: None,
        }
    }

    #[tokio::test]
    async fn health_reflects_store_and_registry() {
        let (scheduler, store, reporter) = setup().await;

        let before = reporter.health().await.unwrap();
        assert!(!before.is_initialized);
        assert_eq!(before.active_schedules, 0);
        assert_eq!(before.scheduled_entries, 0);

        scheduler.schedule(daily_draft("09:00")).await.unwrap();
        let paused = scheduler.schedule(daily_draft("10:00")).await.unwrap();
        scheduler.pause(&paused.id).await.unwrap();

        let health = reporter.health().await.unwrap();
        assert!(health.is_initialized);
        assert_eq!(health.active_schedules, 1);
        assert_eq!(health.scheduled_entries, 1);
        assert_eq!(health.failed_actions, 0);

        // Exhaust a retry budget.
        let action = store.list().await.unwrap().remove(0);
        store
            .patch(
                &action.id,
                ActionPatch {
                    retry_count: Some(action.max_retries),
                    ..ActionPatch::default()
                },
            )
            .await
            .unwrap();
        let health = reporter.health().await.unwrap();
        assert_eq!(health.failed_actions, 1);
    }

    #[tokio::test]
    async fn debug_flags_ghost_entries() {
        let (scheduler, store, reporter) = setup().await;
        let action = scheduler.schedule(daily_draft("09:00")).await.unwrap();

        let clean = reporter.debug().await.unwrap();
        assert_eq!(clean.entries.len(), 1);
        assert_eq!(clean.ghost_count, 0);
        assert!(clean.entries[0].timer_held);

        // Flip the action inactive behind the scheduler's back: the armed
        // entry becomes a ghost until the next reconciliation.
        store
            .patch(&action.id, ActionPatch::set_active(false))
            .await
            .unwrap();

        let snapshot = reporter.debug().await.unwrap();
        assert_eq!(snapshot.ghost_count, 1);
        assert!(snapshot.entries[0].ghost);

        scheduler.reconcile().await.unwrap();
        let after = reporter.debug().await.unwrap();
        assert!(after.entries.is_empty());
        assert_eq!(after.ghost_count, 0);
    }
}
