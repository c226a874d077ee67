//! Calendar-day helpers.
//!
//! Timestamps travel as UTC; "today" is always the device's local calendar day.

use chrono::{DateTime, Local, Utc};

/// Returns true if `instant` falls on the current local calendar day.
pub fn is_today(instant: DateTime<Utc>) -> bool {
    is_same_local_day(instant, Local::now())
}

/// Returns true if `instant`, converted to local time, falls on the same
/// calendar day as `now`.
pub fn is_same_local_day(instant: DateTime<Utc>, now: DateTime<Local>) -> bool {
    instant.with_timezone(&Local).date_naive() == now.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_now_is_today() {
        assert!(is_today(Utc::now()));
    }

    #[test]
    fn test_other_days_are_not_today() {
        let now = Local::now();
        assert!(!is_same_local_day((now - Duration::days(1)).with_timezone(&Utc), now));
        assert!(!is_same_local_day((now + Duration::days(1)).with_timezone(&Utc), now));
    }

    #[test]
    fn test_same_day_compares_in_local_time() {
        let now = Local::now();
        let start_of_day = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|d| d.and_local_timezone(Local).earliest());

        if let Some(start) = start_of_day {
            assert!(is_same_local_day(start.with_timezone(&Utc), now));
            let before = start - Duration::seconds(1);
            assert!(!is_same_local_day(before.with_timezone(&Utc), now));
        }
    }
}
