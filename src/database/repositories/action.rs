//! Scheduled action repository.
//!
//! The persistence boundary of the scheduling engine. Validation happens
//! here: malformed records are rejected before they can ever reach the
//! scheduler.

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use sqlx::SqlitePool;

use crate::database::models::action::normalize_time_of_day;
use crate::database::models::{ActionDraft, ActionPatch, ActionUpdate, ScheduledAction};
use crate::database::time::{datetime_to_ts, now_ts};
use crate::scheduler::timing::next_run_for;
use crate::{Error, Result};

/// Default retry budget for new actions.
const DEFAULT_MAX_RETRIES: i64 = 3;

/// Scheduled action repository trait.
#[async_trait]
pub trait ActionRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ScheduledAction>>;
    async fn get(&self, id: &str) -> Result<ScheduledAction>;
    async fn create(&self, draft: ActionDraft) -> Result<ScheduledAction>;
    async fn update(&self, id: &str, update: ActionUpdate) -> Result<ScheduledAction>;
    async fn patch(&self, id: &str, patch: ActionPatch) -> Result<ScheduledAction>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// SQLx implementation of ActionRepository.
pub struct SqlxActionRepository {
    pool: SqlitePool,
    write_pool: SqlitePool,
    default_tz: Tz,
}

impl SqlxActionRepository {
    pub fn new(pool: SqlitePool, write_pool: SqlitePool, default_tz: Tz) -> Self {
        Self {
            pool,
            write_pool,
            default_tz,
        }
    }

    /// Validate the daily/one-time shape and normalize the time-of-day.
    fn validate_shape(time: &str, is_daily: bool, date: Option<i64>) -> Result<String> {
        let time = normalize_time_of_day(time).ok_or_else(|| {
            Error::validation(format!("Invalid time '{}', expected HH:MM or HH:MM:SS", time))
        })?;

        if !is_daily && date.is_none() {
            return Err(Error::validation(
                "A non-daily action requires an absolute date",
            ));
        }

        Ok(time)
    }

    /// Resolve and validate a timezone name.
    fn validate_timezone(&self, timezone: Option<&str>) -> Result<String> {
        match timezone {
            Some(name) => {
                let _: Tz = name
                    .parse()
                    .map_err(|_| Error::validation(format!("Unknown timezone '{}'", name)))?;
                Ok(name.to_string())
            }
            None => Ok(self.default_tz.name().to_string()),
        }
    }

    /// Reject a second active daily action on the same `(action_type, time)`
    /// slot; both would resolve to one derived schedule key.
    async fn ensure_daily_slot_free(&self, action: &ScheduledAction) -> Result<()> {
        if !action.is_daily || !action.is_active {
            return Ok(());
        }

        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM scheduled_actions
            WHERE is_daily = 1 AND is_active = 1
              AND action_type = ? AND time = ? AND id != ?
            "#,
        )
        .bind(action.action_type)
        .bind(&action.time)
        .bind(&action.id)
        .fetch_one(&self.pool)
        .await?;

        if count > 0 {
            return Err(Error::validation(format!(
                "An active daily {} action at {} already exists",
                action.action_type, action.time
            )));
        }

        Ok(())
    }

    async fn write(&self, action: &ScheduledAction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_actions (
                id, event_id, event_name, action_type, time, date,
                is_daily, is_active, timezone, last_run, next_run,
                max_retries, retry_count, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                event_id = excluded.event_id,
                event_name = excluded.event_name,
                action_type = excluded.action_type,
                time = excluded.time,
                date = excluded.date,
                is_daily = excluded.is_daily,
                is_active = excluded.is_active,
                timezone = excluded.timezone,
                last_run = excluded.last_run,
                next_run = excluded.next_run,
                max_retries = excluded.max_retries,
                retry_count = excluded.retry_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&action.id)
        .bind(&action.event_id)
        .bind(&action.event_name)
        .bind(action.action_type)
        .bind(&action.time)
        .bind(action.date)
        .bind(action.is_daily)
        .bind(action.is_active)
        .bind(&action.timezone)
        .bind(action.last_run)
        .bind(action.next_run)
        .bind(action.max_retries)
        .bind(action.retry_count)
        .bind(action.created_at)
        .bind(action.updated_at)
        .execute(&self.write_pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ActionRepository for SqlxActionRepository {
    async fn list(&self) -> Result<Vec<ScheduledAction>> {
        let actions = sqlx::query_as::<_, ScheduledAction>(
            "SELECT * FROM scheduled_actions ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(actions)
    }

    async fn get(&self, id: &str) -> Result<ScheduledAction> {
        sqlx::query_as::<_, ScheduledAction>("SELECT * FROM scheduled_actions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("ScheduledAction", id))
    }

    async fn create(&self, draft: ActionDraft) -> Result<ScheduledAction> {
        let time = Self::validate_shape(&draft.time, draft.is_daily, draft.date)?;
        let timezone = self.validate_timezone(draft.timezone.as_deref())?;
        let now = now_ts();

        let mut action = ScheduledAction {
            id: uuid::Uuid::new_v4().to_string(),
            event_id: draft.event_id,
            event_name: draft.event_name,
            action_type: draft.action_type,
            time,
            date: draft.date,
            is_daily: draft.is_daily,
            is_active: draft.is_active.unwrap_or(true),
            timezone,
            last_run: None,
            next_run: draft.next_run,
            max_retries: draft.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_count: 0,
            created_at: now,
            updated_at: now,
        };

        if action.next_run.is_none() {
            action.next_run =
                next_run_for(&action, Utc::now(), self.default_tz).map(datetime_to_ts);
        }

        self.ensure_daily_slot_free(&action).await?;
        self.write(&action).await?;
        Ok(action)
    }

    async fn update(&self, id: &str, update: ActionUpdate) -> Result<ScheduledAction> {
        let existing = self.get(id).await?;

        let time = Self::validate_shape(&update.time, update.is_daily, update.date)?;
        let timezone = self.validate_timezone(update.timezone.as_deref())?;

        let mut action = ScheduledAction {
            id: existing.id,
            event_id: update.event_id,
            event_name: update.event_name,
            action_type: update.action_type,
            time,
            date: update.date,
            is_daily: update.is_daily,
            is_active: update.is_active,
            timezone,
            last_run: existing.last_run,
            next_run: None,
            max_retries: update.max_retries,
            retry_count: existing.retry_count.min(update.max_retries.max(0)),
            created_at: existing.created_at,
            updated_at: now_ts(),
        };
        action.next_run = next_run_for(&action, Utc::now(), self.default_tz).map(datetime_to_ts);

        self.ensure_daily_slot_free(&action).await?;
        self.write(&action).await?;
        Ok(action)
    }

    async fn patch(&self, id: &str, patch: ActionPatch) -> Result<ScheduledAction> {
        let existing = self.get(id).await?;
        let reschedule = patch.affects_schedule() && patch.next_run.is_none();

        let mut action = existing;
        if let Some(event_id) = patch.event_id {
            action.event_id = Some(event_id);
        }
        if let Some(event_name) = patch.event_name {
            action.event_name = Some(event_name);
        }
        if let Some(action_type) = patch.action_type {
            action.action_type = action_type;
        }
        if let Some(time) = patch.time {
            action.time = time;
        }
        if let Some(date) = patch.date {
            action.date = Some(date);
        }
        if let Some(is_daily) = patch.is_daily {
            action.is_daily = is_daily;
        }
        if let Some(is_active) = patch.is_active {
            action.is_active = is_active;
        }
        if let Some(timezone) = patch.timezone {
            action.timezone = timezone;
        }
        if let Some(last_run) = patch.last_run {
            action.last_run = Some(last_run);
        }
        if let Some(next_run) = patch.next_run {
            action.next_run = Some(next_run);
        }
        if let Some(max_retries) = patch.max_retries {
            action.max_retries = max_retries;
        }
        if let Some(retry_count) = patch.retry_count {
            action.retry_count = retry_count;
        }
        action.updated_at = now_ts();

        action.time = Self::validate_shape(&action.time, action.is_daily, action.date)?;
        action.timezone = self.validate_timezone(Some(&action.timezone))?;
        // The retry counter never exceeds the budget.
        action.retry_count = action.retry_count.min(action.max_retries.max(0));

        if reschedule {
            action.next_run =
                next_run_for(&action, Utc::now(), self.default_tz).map(datetime_to_ts);
        }

        self.ensure_daily_slot_free(&action).await?;
        self.write(&action).await?;
        Ok(action)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM scheduled_actions WHERE id = ?")
            .bind(id)
            .execute(&self.write_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("ScheduledAction", id));
        }
        Ok(())
    }
}
