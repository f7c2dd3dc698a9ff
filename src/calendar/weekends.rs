//! Weekend shading intervals.

use chrono::{Datelike, Weekday};

use crate::domain::{DateRange, WeekendInterval};

/// One interval per Saturday and per Sunday in `range`.
///
/// Consecutive weekend days are not merged: each day is shaded on its own.
pub fn weekends_in_range(range: &DateRange) -> Vec<WeekendInterval> {
    range
        .days()
        .filter(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .map(WeekendInterval::for_day)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn early_november_2025() {
        let range = DateRange::new(d(2025, 11, 1), d(2025, 11, 10)).unwrap();
        let days: Vec<NaiveDate> = weekends_in_range(&range).iter().map(WeekendInterval::day).collect();
        assert_eq!(days, vec![d(2025, 11, 1), d(2025, 11, 2), d(2025, 11, 8), d(2025, 11, 9)]);
    }

    #[test]
    fn intervals_are_independent_days() {
        let range = DateRange::new(d(2025, 11, 1), d(2025, 11, 2)).unwrap();
        let w = weekends_in_range(&range);
        assert_eq!(w.len(), 2);
        assert_eq!(w[0].end, w[1].start);
        assert_eq!(w[1].end, d(2025, 11, 3).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn weekday_only_range_is_empty() {
        let range = DateRange::new(d(2025, 11, 3), d(2025, 11, 7)).unwrap();
        assert!(weekends_in_range(&range).is_empty());
    }
}
