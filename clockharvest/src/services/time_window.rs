//! Calendar-date window filtering
//!
//! A mark is accepted when its date lies in `[today - window_days, today]`,
//! both bounds inclusive, with "today" evaluated at call time. A run that
//! straddles midnight may therefore shift which marks are accepted between
//! devices processed before vs. after midnight; accepted behavior.

use chrono::{Days, Local, NaiveDate};
use tracing::warn;

/// Accepts or rejects marks by calendar-date window
#[derive(Debug, Clone, Copy)]
pub struct TimeWindowFilter {
    window_days: u32,
}

impl TimeWindowFilter {
    pub fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    /// True when `mark_date` falls inside the window ending today.
    ///
    /// An unparseable date is rejected and logged, never an error.
    pub fn accepts(&self, mark_date: &str) -> bool {
        self.accepts_on(mark_date, Local::now().date_naive())
    }

    fn accepts_on(&self, mark_date: &str, today: NaiveDate) -> bool {
        let date = match NaiveDate::parse_from_str(mark_date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                warn!("Invalid mark date: {:?}", mark_date);
                return false;
            }
        };

        let start = today - Days::new(self.window_days as u64);
        start <= date && date <= today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn bounds_are_inclusive() {
        let filter = TimeWindowFilter::new(1);
        assert!(filter.accepts_on("2024-04-30", today()));
        assert!(filter.accepts_on("2024-05-01", today()));
    }

    #[test]
    fn dates_outside_window_rejected() {
        let filter = TimeWindowFilter::new(1);
        assert!(!filter.accepts_on("2024-04-29", today()));
        assert!(!filter.accepts_on("2024-05-02", today()));
    }

    #[test]
    fn zero_window_accepts_only_today() {
        let filter = TimeWindowFilter::new(0);
        assert!(filter.accepts_on("2024-05-01", today()));
        assert!(!filter.accepts_on("2024-04-30", today()));
    }

    #[test]
    fn wide_window_spans_month_boundary() {
        let filter = TimeWindowFilter::new(31);
        assert!(filter.accepts_on("2024-04-01", today()));
        assert!(!filter.accepts_on("2024-03-31", today()));
    }

    #[test]
    fn unparseable_date_rejected() {
        let filter = TimeWindowFilter::new(1);
        assert!(!filter.accepts_on("yesterday", today()));
        assert!(!filter.accepts_on("2024-05-32", today()));
        assert!(!filter.accepts_on("", today()));
    }
}
