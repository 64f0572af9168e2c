//! Scheduled action database model.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Media-control action types.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Start playback of the resolved target.
    Play,
    /// Pause current playback.
    Pause,
    /// Stop current playback.
    Stop,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Stop => "STOP",
        }
    }
}

/// Scheduled action database model.
///
/// The durable unit of work: a media-control action fired either daily at a
/// fixed local time-of-day, or once at an absolute timestamp.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ScheduledAction {
    /// Store-assigned stable identifier.
    pub id: String,
    /// Optional calendar event correlation.
    pub event_id: Option<String>,
    /// Optional explicit target name.
    pub event_name: Option<String>,
    pub action_type: ActionType,
    /// Local time-of-day, `HH:MM:SS`.
    pub time: String,
    /// Epoch seconds; required when `is_daily` is false.
    pub date: Option<i64>,
    pub is_daily: bool,
    /// Pause/resume flag.
    pub is_active: bool,
    /// IANA zone name.
    pub timezone: String,
    /// Epoch seconds of the last execution, success or failure.
    pub last_run: Option<i64>,
    /// Epoch seconds of the next computed occurrence. A cache, not a source
    /// of truth.
    pub next_run: Option<i64>,
    pub max_retries: i64,
    pub retry_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ScheduledAction {
    /// Parse the `time` column into a `NaiveTime`.
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        parse_time_of_day(&self.time)
    }

    /// Resolve the action's timezone, falling back to the given default.
    pub fn zone_or(&self, default: Tz) -> Tz {
        self.timezone.parse().unwrap_or(default)
    }

    /// Whether the retry budget is exhausted.
    pub fn is_failed(&self) -> bool {
        self.max_retries > 0 && self.retry_count >= self.max_retries
    }
}

/// Parse a time-of-day string in `HH:MM` or `HH:MM:SS` form.
///
/// Seconds default to `00` when omitted.
pub fn parse_time_of_day(input: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .ok()
}

/// Normalize a time-of-day string to canonical `HH:MM:SS` form.
pub fn normalize_time_of_day(input: &str) -> Option<String> {
    parse_time_of_day(input).map(|t| t.format("%H:%M:%S").to_string())
}

/// Fields accepted when creating a scheduled action.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ActionDraft {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub action_type: ActionType,
    /// Local time-of-day, `HH:MM` or `HH:MM:SS`.
    pub time: String,
    /// Epoch seconds; required when `is_daily` is false.
    pub date: Option<i64>,
    #[serde(default)]
    pub is_daily: bool,
    /// Defaults to true.
    pub is_active: Option<bool>,
    /// IANA zone name; defaults to the configured zone.
    pub timezone: Option<String>,
    /// Defaults to 3.
    pub max_retries: Option<i64>,
    /// Computed from the next-occurrence algorithm when absent.
    pub next_run: Option<i64>,
}

/// Full-replacement update for a scheduled action.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ActionUpdate {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub action_type: ActionType,
    pub time: String,
    pub date: Option<i64>,
    pub is_daily: bool,
    pub is_active: bool,
    pub timezone: Option<String>,
    pub max_retries: i64,
}

/// Partial update: only supplied fields are written, everything else keeps
/// its stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ActionPatch {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub action_type: Option<ActionType>,
    pub time: Option<String>,
    pub date: Option<i64>,
    pub is_daily: Option<bool>,
    pub is_active: Option<bool>,
    pub timezone: Option<String>,
    pub last_run: Option<i64>,
    pub next_run: Option<i64>,
    pub max_retries: Option<i64>,
    pub retry_count: Option<i64>,
}

impl ActionPatch {
    /// A patch that only flips the pause/resume flag.
    pub fn set_active(active: bool) -> Self {
        Self {
            is_active: Some(active),
            ..Self::default()
        }
    }

    /// Whether the patch touches any field the scheduler derives timers
    /// from.
    pub fn affects_schedule(&self) -> bool {
        self.action_type.is_some()
            || self.time.is_some()
            || self.date.is_some()
            || self.is_daily.is_some()
            || self.is_active.is_some()
            || self.timezone.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_roundtrip() {
        assert_eq!(ActionType::Play.as_str(), "PLAY");
        assert_eq!("STOP".parse::<ActionType>().ok(), Some(ActionType::Stop));
        assert!("SKIP".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("09:30:15"),
            NaiveTime::from_hms_opt(9, 30, 15)
        );
        // Seconds default to 00.
        assert_eq!(
            parse_time_of_day("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("not a time").is_none());
    }

    #[test]
    fn test_normalize_time_of_day() {
        assert_eq!(normalize_time_of_day("07:15"), Some("07:15:00".to_string()));
        assert_eq!(
            normalize_time_of_day("07:15:30"),
            Some("07:15:30".to_string())
        );
        assert_eq!(normalize_time_of_day("7:5"), None);
    }

    #[test]
    fn test_is_failed() {
        let mut action = sample_action();
        assert!(!action.is_failed());
        action.retry_count = action.max_retries;
        assert!(action.is_failed());
        action.max_retries = 0;
        assert!(!action.is_failed());
    }

    #[test]
    fn test_zone_fallback() {
        let mut action = sample_action();
        action.timezone = "Not/AZone".to_string();
        assert_eq!(action.zone_or(chrono_tz::UTC), chrono_tz::UTC);
        action.timezone = "Europe/Madrid".to_string();
        assert_eq!(action.zone_or(chrono_tz::UTC), chrono_tz::Europe::Madrid);
    }

    fn sample_action() -> ScheduledAction {
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
}
