//! Relationship timer.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use crate::constants::RELATIONSHIP_START_DATE;

/// Midnight of the start date in the local time zone.
pub fn relationship_start() -> Option<DateTime<Utc>> {
    let (year, month, day) = RELATIONSHIP_START_DATE;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render the span between `start` and `now` as `"{d}d {h}h {m}m {s}s"`.
/// A start in the future renders as zero.
pub fn format_elapsed(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - start).num_seconds().max(0);
    format!(
        "{}d {}h {}m {}s",
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_elapsed() {
        let start = Utc.with_ymd_and_hms(2026, 1, 28, 0, 0, 0).unwrap();
        let now = start + Duration::days(3) + Duration::hours(4) + Duration::minutes(5) + Duration::seconds(6);
        assert_eq!(format_elapsed(start, now), "3d 4h 5m 6s");
    }

    #[test]
    fn test_future_start_is_zero() {
        let now = Utc::now();
        assert_eq!(format_elapsed(now + Duration::hours(1), now), "0d 0h 0m 0s");
    }

    #[test]
    fn test_relationship_start_resolves() {
        assert!(relationship_start().is_some());
    }
}
