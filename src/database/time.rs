//! Timestamp helpers for the database layer.
//!
//! Timestamps are stored as `INTEGER` Unix epoch seconds (UTC) in SQLite.

use chrono::{DateTime, TimeZone, Utc};

/// Current time as Unix epoch seconds (UTC).
#[inline]
pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Convert a `DateTime<Utc>` to Unix epoch seconds.
#[inline]
pub fn datetime_to_ts(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Convert Unix epoch seconds to `DateTime<Utc>`.
///
/// Values outside chrono's supported range clamp to the nearest
/// representable timestamp.
#[inline]
pub fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    match Utc.timestamp_opt(ts, 0) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => {
            if ts.is_negative() {
                Utc.timestamp_opt(i64::MIN / 1_000, 0)
                    .earliest()
                    .unwrap_or_else(Utc::now)
            } else {
                Utc.timestamp_opt(i64::MAX / 1_000, 0)
                    .latest()
                    .unwrap_or_else(Utc::now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let now = Utc::now();
        let ts = datetime_to_ts(now);
        assert_eq!(ts_to_datetime(ts).timestamp(), now.timestamp());
    }

    #[test]
    fn test_out_of_range_clamps() {
        // Must not panic on absurd values.
        let _ = ts_to_datetime(i64::MAX);
        let _ = ts_to_datetime(i64::MIN);
    }
}
