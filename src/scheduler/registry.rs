//! Schedule registry: exclusive owner of every live timer.
//!
//! The active timer set is always a pure function of the most recent
//! reconciliation pass, never an accumulation of stale entries. Timer
//! resources (a child cancellation token plus the task's abort handle) are
//! held only here; the scheduler and executor never touch them directly, so
//! cancellation stays centralized.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use utoipa::ToSchema;

/// Occurrence pattern of a schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Daily,
    OneTime,
}

/// Metadata for one armed timer.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    /// Derived registry key: `daily:<TYPE>:<HH:MM:SS>` or `once:<action id>`.
    pub schedule_id: String,
    /// Store-assigned id of the backing action.
    pub action_id: String,
    pub kind: ScheduleKind,
    /// Instant the timer is armed for.
    pub scheduled_at: DateTime<Utc>,
}

/// Introspection view of one armed entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleEntrySnapshot {
    pub schedule_id: String,
    pub action_id: String,
    pub kind: ScheduleKind,
    pub scheduled_at: DateTime<Utc>,
    /// Whether the timer task is still held (not yet finished or aborted).
    pub timer_held: bool,
}

/// An entry together with the timer resources it owns.
struct ArmedEntry {
    entry: ScheduleEntry,
    cancel: CancellationToken,
    abort: AbortHandle,
}

/// Registry of armed schedule entries keyed by schedule id.
#[derive(Default)]
pub struct ScheduleRegistry {
    entries: HashMap<String, ArmedEntry>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an entry and take ownership of its timer resources.
    ///
    /// Returns false (and cancels the offered timer) when an entry with the
    /// same schedule id is already armed.
    pub fn arm(&mut self, entry: ScheduleEntry, cancel: CancellationToken, abort: AbortHandle) -> bool {
        if self.entries.contains_key(&entry.schedule_id) {
            cancel.cancel();
            abort.abort();
            return false;
        }

        debug!(
            schedule_id = %entry.schedule_id,
            kind = %entry.kind,
            scheduled_at = %entry.scheduled_at,
            "Armed schedule entry"
        );
        self.entries.insert(
            entry.schedule_id.clone(),
            ArmedEntry {
                entry,
                cancel,
                abort,
            },
        );
        true
    }

    /// Cancel every tracked timer and empty the map.
    ///
    /// Idempotent and safe to call with zero entries.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        for armed in self.entries.values() {
            armed.cancel.cancel();
            armed.abort.abort();
        }
        self.entries.clear();
        if count > 0 {
            debug!(count, "Cleared schedule registry");
        }
    }

    /// Cancel and remove a single entry. Returns true when it existed.
    pub fn remove(&mut self, schedule_id: &str) -> bool {
        match self.entries.remove(schedule_id) {
            Some(armed) => {
                armed.cancel.cancel();
                armed.abort.abort();
                debug!(schedule_id, "Removed schedule entry");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, schedule_id: &str) -> bool {
        self.entries.contains_key(schedule_id)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot every armed entry for introspection.
    pub fn snapshot(&self) -> Vec<ScheduleEntrySnapshot> {
        let mut entries: Vec<_> = self
            .entries
            .values()
            .map(|armed| ScheduleEntrySnapshot {
                schedule_id: armed.entry.schedule_id.clone(),
                action_id: armed.entry.action_id.clone(),
                kind: armed.entry.kind,
                scheduled_at: armed.entry.scheduled_at,
                timer_held: !armed.abort.is_finished(),
            })
            .collect();
        entries.sort_by(|a, b| a.schedule_id.cmp(&b.schedule_id));
        entries
    }

    /// Currently armed schedule ids.
    pub fn list_active(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, kind: ScheduleKind) -> ScheduleEntry {
        ScheduleEntry {
            schedule_id: id.to_string(),
            action_id: format!("action-{}", id),
            kind,
            scheduled_at: Utc::now(),
        }
    }

    fn arm_dummy(registry: &mut ScheduleRegistry, id: &str, kind: ScheduleKind) -> CancellationToken {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(std::future::pending::<()>());
        assert!(registry.arm(entry(id, kind), cancel.clone(), task.abort_handle()));
        cancel
    }

    #[tokio::test]
    async fn clear_cancels_and_empties() {
        let mut registry = ScheduleRegistry::new();
        let token_a = arm_dummy(&mut registry, "daily:PLAY:09:00:00", ScheduleKind::Daily);
        let token_b = arm_dummy(&mut registry, "once:a1", ScheduleKind::OneTime);
        assert_eq!(registry.size(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.list_active().is_empty());
        assert!(token_a.is_cancelled());
        assert!(token_b.is_cancelled());

        // Second clear is a no-op.
        registry.clear();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn arm_rejects_duplicate_schedule_id() {
        let mut registry = ScheduleRegistry::new();
        arm_dummy(&mut registry, "daily:PLAY:09:00:00", ScheduleKind::Daily);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(std::future::pending::<()>());
        let armed = registry.arm(
            entry("daily:PLAY:09:00:00", ScheduleKind::Daily),
            cancel.clone(),
            task.abort_handle(),
        );
        assert!(!armed);
        // The rejected timer was cancelled, not leaked.
        assert!(cancel.is_cancelled());
        assert_eq!(registry.size(), 1);
    }

    #[tokio::test]
    async fn remove_cancels_single_entry() {
        let mut registry = ScheduleRegistry::new();
        let token = arm_dummy(&mut registry, "once:a1", ScheduleKind::OneTime);
        arm_dummy(&mut registry, "once:a2", ScheduleKind::OneTime);

        assert!(registry.remove("once:a1"));
        assert!(token.is_cancelled());
        assert!(!registry.remove("once:a1"));
        assert_eq!(registry.list_active(), vec!["once:a2".to_string()]);
    }

    #[tokio::test]
    async fn snapshot_is_sorted_and_complete() {
        let mut registry = ScheduleRegistry::new();
        arm_dummy(&mut registry, "once:b", ScheduleKind::OneTime);
        arm_dummy(&mut registry, "daily:STOP:22:00:00", ScheduleKind::Daily);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].schedule_id, "daily:STOP:22:00:00");
        assert!(snapshot.iter().all(|e| e.timer_held));
    }
}
