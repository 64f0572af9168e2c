//! Scheduling math for daily and one-time actions.
//!
//! All functions are pure over an explicit `now` so the next-occurrence
//! algorithm can be tested against fixed instants.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::database::models::action::parse_time_of_day;
use crate::database::models::ScheduledAction;
use crate::database::time::ts_to_datetime;

/// Compute the smallest instant strictly after `now` whose wall-clock
/// time-of-day equals `time` in `tz`.
///
/// If today's occurrence has already passed, the result is tomorrow at the
/// same local time. DST folds resolve to the earlier instant; a time that
/// falls into a DST gap shifts forward by the gap.
pub fn next_daily_occurrence(time: NaiveTime, tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);

    // Today's occurrence can be skipped (already passed) or unmapped (DST
    // gap), so probe a couple of days forward.
    for day_offset in 0..3 {
        let date = local_now.date_naive() + Duration::days(day_offset);
        let naive = date.and_time(time);

        let candidate = match tz.from_local_datetime(&naive) {
            chrono::LocalResult::Single(dt) => Some(dt),
            chrono::LocalResult::Ambiguous(earlier, _later) => Some(earlier),
            // Spring-forward gap: the wall-clock time does not exist on this
            // date; shift past the gap.
            chrono::LocalResult::None => tz
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest(),
        };

        if let Some(candidate) = candidate {
            let candidate_utc = candidate.with_timezone(&Utc);
            if candidate_utc > now {
                return candidate_utc;
            }
        }
    }

    // Unreachable for any real timezone; degrade to a plain 24h delay.
    now + Duration::hours(24)
}

/// Compute the next run instant for an action, or `None` when the action can
/// never fire again (a one-time action with a past or missing `date`).
pub fn next_run_for(
    action: &ScheduledAction,
    now: DateTime<Utc>,
    default_tz: Tz,
) -> Option<DateTime<Utc>> {
    if action.is_daily {
        let time = action.time_of_day()?;
        Some(next_daily_occurrence(time, action.zone_or(default_tz), now))
    } else {
        let date = ts_to_datetime(action.date?);
        (date >= now).then_some(date)
    }
}

/// Derive the registry key for an action.
///
/// One-time entries key on the store-assigned id (collision-free by
/// construction); daily entries use the `(action type, time)` slot, which
/// the store keeps unique among active daily actions.
pub fn schedule_id_for(action: &ScheduledAction) -> String {
    if action.is_daily {
        format!("daily:{}:{}", action.action_type.as_str(), action.time)
    } else {
        format!("once:{}", action.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ActionType;
    use chrono_tz::{Europe, UTC};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn daily_occurrence_later_today() {
        // 08:00 UTC, target 09:00 UTC -> today 09:00.
        let now = utc(2026, 3, 10, 8, 0, 0);
        let next = next_daily_occurrence(time(9, 0, 0), UTC, now);
        assert_eq!(next, utc(2026, 3, 10, 9, 0, 0));
    }

    #[test]
    fn daily_occurrence_already_passed_targets_tomorrow() {
        let now = utc(2026, 3, 10, 9, 0, 1);
        let next = next_daily_occurrence(time(9, 0, 0), UTC, now);
        assert_eq!(next, utc(2026, 3, 11, 9, 0, 0));
    }

    #[test]
    fn daily_occurrence_exact_boundary_is_strictly_future() {
        let now = utc(2026, 3, 10, 9, 0, 0);
        let next = next_daily_occurrence(time(9, 0, 0), UTC, now);
        assert_eq!(next, utc(2026, 3, 11, 9, 0, 0));
    }

    #[test]
    fn daily_occurrence_respects_timezone() {
        // 09:00 in Madrid (CET, +01:00) is 08:00 UTC.
        let now = utc(2026, 1, 15, 6, 0, 0);
        let next = next_daily_occurrence(time(9, 0, 0), Europe::Madrid, now);
        assert_eq!(next, utc(2026, 1, 15, 8, 0, 0));
    }

    #[test]
    fn daily_occurrence_skips_dst_gap() {
        // Spain springs forward on 2026-03-29: 02:00-03:00 CET does not
        // exist. 02:30 local shifts past the gap.
        let now = utc(2026, 3, 29, 0, 0, 0);
        let next = next_daily_occurrence(time(2, 30, 0), Europe::Madrid, now);
        assert!(next > now);
        // Resolves on the 29th, after the jump to CEST (+02:00).
        assert_eq!(next, utc(2026, 3, 29, 1, 30, 0));
    }

    #[test]
    fn daily_occurrence_fold_resolves_to_earlier_instant() {
        // Spain falls back on 2026-10-25: 02:30 local happens twice.
        let now = utc(2026, 10, 24, 12, 0, 0);
        let next = next_daily_occurrence(time(2, 30, 0), Europe::Madrid, now);
        // Earlier mapping is CEST (+02:00) -> 00:30 UTC.
        assert_eq!(next, utc(2026, 10, 25, 0, 30, 0));
    }

    #[test]
    fn next_run_for_one_time_future() {
        let now = utc(2026, 5, 1, 12, 0, 0);
        let action = one_time_action(utc(2026, 5, 1, 12, 0, 10).timestamp());
        assert_eq!(
            next_run_for(&action, now, UTC),
            Some(utc(2026, 5, 1, 12, 0, 10))
        );
    }

    #[test]
    fn next_run_for_one_time_past_is_none() {
        let now = utc(2026, 5, 1, 12, 0, 0);
        let action = one_time_action(utc(2026, 5, 1, 11, 59, 59).timestamp());
        assert_eq!(next_run_for(&action, now, UTC), None);
    }

    #[test]
    fn next_run_for_one_time_without_date_is_none() {
        let now = utc(2026, 5, 1, 12, 0, 0);
        let mut action = one_time_action(0);
        action.date = None;
        assert_eq!(next_run_for(&action, now, UTC), None);
    }

    #[test]
    fn schedule_id_shapes() {
        let mut action = one_time_action(0);
        assert_eq!(schedule_id_for(&action), format!("once:{}", action.id));
        action.is_daily = true;
        assert_eq!(schedule_id_for(&action), "daily:STOP:22:00:00");
    }

    fn one_time_action(date: i64) -> ScheduledAction {
        ScheduledAction {
            id: "act-1".to_string(),
            event_id: None,
            event_name: None,
            action_type: ActionType::Stop,
            time: "22:00:00".to_string(),
            date: Some(date),
            is_daily: false,
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
}
