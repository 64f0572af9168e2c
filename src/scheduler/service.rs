//! Scheduler service.
//!
//! The orchestrator: rebuilds the live timer set from the store with a
//! full clear-all + re-arm pass on every mutation (no incremental
//! patching), owns the pause/resume/remove surface, and drives the fire
//! path with a store freshness check so a paused or deleted action can
//! never execute even when its timer was already in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::database::models::{ActionDraft, ActionPatch, ActionUpdate, ScheduledAction};
use crate::database::repositories::ActionRepository;
use crate::{Error, Result};

use super::executor::ActionExecutor;
use super::registry::{ScheduleEntry, ScheduleEntrySnapshot, ScheduleKind, ScheduleRegistry};
use super::timing::{next_run_for, schedule_id_for};

/// Fixed re-arm period for daily entries.
const DAILY_PERIOD: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct ReconcileSummary {
    pub armed_daily: usize,
    pub armed_one_time: usize,
    /// One-time actions whose date already passed (never executed
    /// retroactively).
    pub skipped_past: usize,
    /// Paused actions.
    pub skipped_inactive: usize,
    /// Actions colliding on an already-armed schedule id.
    pub skipped_duplicate: usize,
}

impl ReconcileSummary {
    pub fn armed(&self) -> usize {
        self.armed_daily + self.armed_one_time
    }
}

/// The scheduling engine.
///
/// Explicitly constructed and dependency-injected; one live instance per
/// process. `start()` runs the initial reconciliation, `stop()` cancels
/// every timer and refuses further work.
pub struct Scheduler {
    store: Arc<dyn ActionRepository>,
    executor: Arc<ActionExecutor>,
    /// The only mutable shared state in the engine. Never held across an
    /// await.
    registry: Mutex<ScheduleRegistry>,
    /// Serializes whole reconciliation passes (fetch + rebuild).
    reconcile_gate: tokio::sync::Mutex<()>,
    default_tz: Tz,
    /// Parent of every entry's timer token.
    cancel: CancellationToken,
    /// True once the first reconciliation has succeeded since process
    /// start (or the last reinitialize).
    initialized: AtomicBool,
    started_at: Instant,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn ActionRepository>,
        executor: Arc<ActionExecutor>,
        default_tz: Tz,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            executor,
            registry: Mutex::new(ScheduleRegistry::new()),
            reconcile_gate: tokio::sync::Mutex::new(()),
            default_tz,
            cancel,
            initialized: AtomicBool::new(false),
            started_at: Instant::now(),
        }
    }

    /// Start the scheduler: run the initial reconciliation.
    pub async fn start(self: &Arc<Self>) -> Result<ReconcileSummary> {
        info!("Starting scheduler");
        let summary = self.reconcile().await?;
        info!(
            armed_daily = summary.armed_daily,
            armed_one_time = summary.armed_one_time,
            "Scheduler started"
        );
        Ok(summary)
    }

    /// Stop the scheduler: cancel every timer and refuse further work.
    pub fn stop(&self) {
        info!("Stopping scheduler");
        self.cancel.cancel();
        self.registry.lock().clear();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// True once the first reconciliation has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Number of armed registry entries.
    pub fn entry_count(&self) -> usize {
        self.registry.lock().size()
    }

    /// Snapshot of every armed entry.
    pub fn registry_snapshot(&self) -> Vec<ScheduleEntrySnapshot> {
        self.registry.lock().snapshot()
    }

    /// Rebuild the entire live timer set from the persisted action list.
    ///
    /// The store is read before the registry is touched: when the fetch
    /// fails the previous timer set stays armed rather than being left
    /// empty.
    pub async fn reconcile(self: &Arc<Self>) -> Result<ReconcileSummary> {
        if self.cancel.is_cancelled() {
            return Err(Error::scheduler("scheduler is stopped"));
        }

        let _gate = self.reconcile_gate.lock().await;

        let actions = match self.store.list().await {
            Ok(actions) => actions,
            Err(error) => {
                warn!(
                    error = %error,
                    "Reconciliation fetch failed; keeping previous timer set"
                );
                return Err(error);
            }
        };

        let now = Utc::now();
        let mut summary = ReconcileSummary::default();

        {
            let mut registry = self.registry.lock();
            registry.clear();

            for action in actions {
                if !action.is_active {
                    summary.skipped_inactive += 1;
                    continue;
                }
                self.arm_action(&mut registry, action, now, &mut summary);
            }
        }

        self.initialized.store(true, Ordering::Release);
        debug!(
            armed = summary.armed(),
            skipped_past = summary.skipped_past,
            skipped_inactive = summary.skipped_inactive,
            "Reconciliation complete"
        );
        Ok(summary)
    }

    /// Arm one action into the given registry.
    fn arm_action(
        self: &Arc<Self>,
        registry: &mut ScheduleRegistry,
        action: ScheduledAction,
        now: DateTime<Utc>,
        summary: &mut ReconcileSummary,
    ) {
        let Some(next) = next_run_for(&action, now, self.default_tz) else {
            if action.is_daily {
                // Unparseable time; the store validates this away, but a
                // malformed row must not wedge reconciliation.
                warn!(action_id = %action.id, time = %action.time, "Daily action with invalid time, skipping");
            } else {
                debug!(action_id = %action.id, "One-time action in the past, skipping");
                summary.skipped_past += 1;
            }
            return;
        };

        let schedule_id = schedule_id_for(&action);
        if registry.contains(&schedule_id) {
            // The store rejects duplicate daily slots; a collision here
            // means a malformed row slipped through. Never silently
            // overwrite an armed timer.
            warn!(
                action_id = %action.id,
                schedule_id = %schedule_id,
                "Duplicate schedule id, skipping"
            );
            summary.skipped_duplicate += 1;
            return;
        }

        let kind = if action.is_daily {
            ScheduleKind::Daily
        } else {
            ScheduleKind::OneTime
        };
        let entry = ScheduleEntry {
            schedule_id: schedule_id.clone(),
            action_id: action.id.clone(),
            kind,
            scheduled_at: next,
        };

        let cancel = self.cancel.child_token();
        let task = match kind {
            ScheduleKind::Daily => tokio::spawn(run_daily(
                self.clone(),
                action.id,
                next,
                cancel.clone(),
            )),
            ScheduleKind::OneTime => tokio::spawn(run_one_time(
                self.clone(),
                action.id,
                schedule_id,
                next,
                cancel.clone(),
            )),
        };

        registry.arm(entry, cancel, task.abort_handle());
        match kind {
            ScheduleKind::Daily => summary.armed_daily += 1,
            ScheduleKind::OneTime => summary.armed_one_time += 1,
        }
    }

    /// Create an action and rebuild the timer set.
    pub async fn schedule(self: &Arc<Self>, draft: ActionDraft) -> Result<ScheduledAction> {
        let action = self.store.create(draft).await?;
        self.reconcile().await?;
        Ok(action)
    }

    /// Replace an action and rebuild the timer set.
    pub async fn update_action(
        self: &Arc<Self>,
        id: &str,
        update: ActionUpdate,
    ) -> Result<ScheduledAction> {
        let action = self.store.update(id, update).await?;
        self.reconcile().await?;
        Ok(action)
    }

    /// Partially update an action and rebuild the timer set.
    pub async fn patch_action(
        self: &Arc<Self>,
        id: &str,
        patch: ActionPatch,
    ) -> Result<ScheduledAction> {
        let action = self.store.patch(id, patch).await?;
        self.reconcile().await?;
        Ok(action)
    }

    /// Delete an action and rebuild the timer set before returning, so
    /// there is no window in which the deleted action can still fire.
    pub async fn remove(self: &Arc<Self>, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        self.reconcile().await?;
        Ok(())
    }

    /// Pause an action. The rebuilt timer set drops its entry, and the fire
    /// path's freshness check covers a timer already in flight.
    pub async fn pause(self: &Arc<Self>, id: &str) -> Result<ScheduledAction> {
        let action = self.store.patch(id, ActionPatch::set_active(false)).await?;
        self.reconcile().await?;
        Ok(action)
    }

    /// Resume a paused action; it is re-armed by the reconciliation.
    pub async fn resume(self: &Arc<Self>, id: &str) -> Result<ScheduledAction> {
        let action = self.store.patch(id, ActionPatch::set_active(true)).await?;
        self.reconcile().await?;
        Ok(action)
    }

    /// Reset the initialized flag and force a fresh reconciliation.
    pub async fn reinitialize(self: &Arc<Self>) -> Result<ReconcileSummary> {
        self.initialized.store(false, Ordering::Release);
        self.reconcile().await
    }

    /// Fire path for a due timer.
    ///
    /// Re-checks the action against the store immediately before invoking
    /// the executor. This freshness check is mandatory: clearing a timer
    /// cannot reach a callback that is already in flight, so absence from
    /// the registry alone is not enough to stop a paused or deleted action.
    pub(crate) async fn fire(&self, action_id: &str) {
        let action = match self.store.get(action_id).await {
            Ok(action) => action,
            Err(Error::NotFound { .. }) => {
                debug!(action_id, "Action gone before fire, skipping");
                return;
            }
            Err(error) => {
                warn!(action_id, error = %error, "Freshness check failed, skipping fire");
                return;
            }
        };

        if !action.is_active {
            debug!(action_id, "Action paused before fire, skipping");
            return;
        }

        self.executor.execute_and_record(&action).await;
    }

    /// Drop a one-time entry from the registry after its single firing.
    fn retire(&self, schedule_id: &str) {
        if self.registry.lock().remove(schedule_id) {
            debug!(schedule_id, "Retired one-time entry");
        }
    }
}

/// Timer task for a daily entry: one-shot sleep to the first occurrence,
/// then a fixed 24-hour repeating timer until cancelled by the next
/// reconciliation.
async fn run_daily(
    scheduler: Arc<Scheduler>,
    action_id: String,
    first: DateTime<Utc>,
    cancel: CancellationToken,
) {
    let deadline = deadline_for(first);
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep_until(deadline) => {}
    }
    scheduler.fire(&action_id).await;

    let mut ticker = tokio::time::interval_at(deadline + DAILY_PERIOD, DAILY_PERIOD);
    // Sleep/wake gaps are best-effort: skip missed occurrences instead of
    // bursting; the next reconciliation re-aligns the wall-clock target.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => scheduler.fire(&action_id).await,
        }
    }
}

/// Timer task for a one-time entry: a single firing, then the entry
/// retires itself from the registry (the store record remains).
async fn run_one_time(
    scheduler: Arc<Scheduler>,
    action_id: String,
    schedule_id: String,
    at: DateTime<Utc>,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep_until(deadline_for(at)) => {}
    }
    scheduler.fire(&action_id).await;
    scheduler.retire(&schedule_id);
}

/// Convert an absolute wall-clock target into a tokio deadline.
fn deadline_for(at: DateTime<Utc>) -> tokio::time::Instant {
    let delay = (at - Utc::now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO);
    tokio::time::Instant::now() + delay
}
