//! Season-change markers.
//!
//! Fixed month/day pairs stand in for the equinoxes and solstices. The real
//! instants drift by a day or so between years; the heatmap bands only need
//! the coarse position.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

/// `(month, day)` of spring, summer, autumn and winter starts.
pub const SEASON_MARKERS: [(u32, u32); 4] = [(3, 20), (6, 21), (9, 22), (12, 21)];

pub fn is_season_boundary(date: NaiveDate) -> bool {
    SEASON_MARKERS.contains(&(date.month(), date.day()))
}

/// Ascending dates of `dates` that fall on a season marker, every year kept.
pub fn season_boundaries<I>(dates: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    dates
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|d| is_season_boundary(*d))
        .collect()
}
