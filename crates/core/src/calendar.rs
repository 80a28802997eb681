//! Week-cycle helpers. Weekly-hour rows key on the first day of a fixed
//! seven-day cycle (Monday); every write path normalizes through here so the
//! (line item, week start) uniqueness constraint holds.

use chrono::{Datelike, Duration, NaiveDate};

/// The Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Whether `date` already is a week start.
pub fn is_week_start(date: NaiveDate) -> bool {
    week_start(date) == date
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{is_week_start, week_start};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn monday_is_its_own_week_start() {
        let monday = date(2026, 3, 2);
        assert_eq!(week_start(monday), monday);
        assert!(is_week_start(monday));
    }

    #[test]
    fn sunday_rolls_back_six_days() {
        assert_eq!(week_start(date(2026, 3, 8)), date(2026, 3, 2));
        assert!(!is_week_start(date(2026, 3, 8)));
    }

    #[test]
    fn week_start_crosses_month_boundary() {
        // 2026-04-01 is a Wednesday.
        assert_eq!(week_start(date(2026, 4, 1)), date(2026, 3, 30));
    }
}
