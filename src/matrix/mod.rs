//! Calendar matrices: long-form hourly readings reshaped into `date × hour`.
//!
//! Rows are distinct dates in ascending order, columns are hours `0..24`.
//! Cells remember whether a reading was observed; the fill policy only applies
//! when values are read back.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate, Timelike};
use serde::Serialize;

use crate::domain::{FillPolicy, HourlyReading};
use crate::error::{PipelineError, Result};

pub const HOURS: usize = 24;

/// Raw content of one matrix cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Observed(f64),
    Missing,
}

impl Cell {
    pub fn observed(self) -> Option<f64> {
        match self {
            Cell::Observed(v) => Some(v),
            Cell::Missing => None,
        }
    }

    pub fn read(self, fill: FillPolicy) -> f64 {
        self.observed().unwrap_or_else(|| fill.sentinel())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarMatrix {
    dates: Vec<NaiveDate>,
    cells: Vec<[Option<f64>; HOURS]>,
    fill: FillPolicy,
}

impl CalendarMatrix {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_cols(&self) -> usize {
        HOURS
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn fill_policy(&self) -> FillPolicy {
        self.fill
    }

    /// Same cells, read back with a different gap policy.
    pub fn with_fill(mut self, fill: FillPolicy) -> Self {
        self.fill = fill;
        self
    }

    /// Raw cell by position. `None` when the position is out of bounds.
    pub fn cell(&self, row: usize, hour: usize) -> Option<Cell> {
        let value = self.cells.get(row)?.get(hour)?;
        Some(value.map_or(Cell::Missing, Cell::Observed))
    }

    /// Raw cell by date. `None` when the date is not a row of the matrix.
    pub fn cell_at(&self, date: NaiveDate, hour: usize) -> Option<Cell> {
        let row = self.dates.binary_search(&date).ok()?;
        self.cell(row, hour)
    }

    /// Cell value with the matrix fill policy applied.
    pub fn value(&self, row: usize, hour: usize) -> Option<f64> {
        self.cell(row, hour).map(|c| c.read(self.fill))
    }

    pub fn row_values(&self, row: usize) -> Option<[f64; HOURS]> {
        let raw = self.cells.get(row)?;
        let sentinel = self.fill.sentinel();
        Some(raw.map(|c| c.unwrap_or(sentinel)))
    }

    pub fn observed_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Min/max over observed cells only.
    pub fn observed_range(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn month_ticks(&self) -> Vec<NaiveDate> {
        month_ticks(&self.dates)
    }
}

/// Pivot hourly readings into a calendar matrix.
///
/// Fails with `DuplicateKey` when two readings land on the same `(date, hour)`
/// and with `MalformedRecord` on non-finite values.
pub fn build_matrix(readings: &[HourlyReading], source_name: &str, fill: FillPolicy) -> Result<CalendarMatrix> {
    let mut rows: BTreeMap<NaiveDate, [Option<f64>; HOURS]> = BTreeMap::new();

    for (idx, reading) in readings.iter().enumerate() {
        if !reading.value.is_finite() {
            return Err(PipelineError::MalformedRecord {
                source_name: source_name.to_string(),
                line: idx + 1,
                message: format!("non-finite value at {}", reading.at),
            });
        }

        let date = reading.at.date();
        let hour = reading.at.hour();
        let row = rows.entry(date).or_insert([None; HOURS]);
        // `hour()` is always < 24.
        let slot = &mut row[hour as usize];
        if slot.is_some() {
            return Err(PipelineError::DuplicateKey { date, hour });
        }
        *slot = Some(reading.value);
    }

    let (dates, cells): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
    Ok(CalendarMatrix { dates, cells, fill })
}

/// Identity of a reading set as seen by `build_matrix`.
///
/// Hashes the normalized timestamps and the exact value bits, so the same file
/// loaded into two zones yields two fingerprints.
pub fn fingerprint(readings: &[HourlyReading]) -> u64 {
    let mut hasher = DefaultHasher::new();
    readings.len().hash(&mut hasher);
    for r in readings {
        r.at.hash(&mut hasher);
        r.value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Dates that open a month.
pub fn month_ticks(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    dates.iter().copied().filter(|d| d.day() == 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn reading(y: i32, m: u32, d: u32, h: u32, value: f64) -> HourlyReading {
        HourlyReading { at: at(y, m, d, h), value }
    }

    #[test]
    fn pivots_sorted_and_zero_filled() {
        let readings = vec![
            reading(2024, 3, 2, 5, 41.5),
            reading(2024, 3, 1, 0, 12.0),
            reading(2024, 3, 1, 23, -1.25),
        ];
        let m = build_matrix(&readings, "spot.csv", FillPolicy::Zero).unwrap();

        assert_eq!(
            m.dates(),
            &[
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
            ]
        );
        assert_eq!(m.n_cols(), 24);
        assert_eq!(m.value(0, 0), Some(12.0));
        assert_eq!(m.value(0, 23), Some(-1.25));
        assert_eq!(m.value(1, 5), Some(41.5));
        assert_eq!(m.value(1, 6), Some(0.0));
        assert_eq!(m.cell(1, 6), Some(Cell::Missing));
        assert_eq!(m.observed_count(), 3);
        assert_eq!(m.value(0, 24), None);
    }

    #[test]
    fn observed_zero_is_distinct_from_gap() {
        let readings = vec![reading(2024, 1, 1, 3, 0.0)];
        let m = build_matrix(&readings, "t", FillPolicy::Zero).unwrap();
        assert_eq!(m.cell(0, 3), Some(Cell::Observed(0.0)));
        assert_eq!(m.cell(0, 4), Some(Cell::Missing));
        assert_eq!(m.value(0, 3), m.value(0, 4));
    }

    #[test]
    fn nan_fill_leaves_gaps_blank() {
        let readings = vec![reading(2024, 1, 1, 3, 7.0)];
        let m = build_matrix(&readings, "t", FillPolicy::Nan).unwrap();
        assert!(m.value(0, 0).unwrap().is_nan());
        assert_eq!(m.value(0, 3), Some(7.0));
        let zero = m.with_fill(FillPolicy::Zero);
        assert_eq!(zero.row_values(0).unwrap()[0], 0.0);
    }

    #[test]
    fn duplicate_cell_fails_loudly() {
        let readings = vec![reading(2025, 10, 26, 2, 10.0), reading(2025, 10, 26, 2, 11.0)];
        let err = build_matrix(&readings, "t", FillPolicy::Zero).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DuplicateKey {
                date: NaiveDate::from_ymd_opt(2025, 10, 26).unwrap(),
                hour: 2
            }
        );
    }

    #[test]
    fn sub_hourly_readings_collide_on_the_hour() {
        let mut second = reading(2025, 1, 1, 7, 2.0);
        second.at += chrono::Duration::minutes(30);
        let readings = vec![reading(2025, 1, 1, 7, 1.0), second];
        assert!(matches!(
            build_matrix(&readings, "t", FillPolicy::Zero),
            Err(PipelineError::DuplicateKey { hour: 7, .. })
        ));
    }

    #[test]
    fn non_finite_value_is_malformed() {
        let readings = vec![reading(2025, 1, 1, 0, 1.0), reading(2025, 1, 1, 1, f64::INFINITY)];
        assert!(matches!(
            build_matrix(&readings, "temperaturas.csv", FillPolicy::Zero),
            Err(PipelineError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn month_ticks_pick_first_days() {
        let readings = vec![
            reading(2024, 1, 31, 0, 1.0),
            reading(2024, 2, 1, 0, 1.0),
            reading(2024, 2, 2, 0, 1.0),
            reading(2024, 4, 1, 0, 1.0),
        ];
        let m = build_matrix(&readings, "t", FillPolicy::Zero).unwrap();
        assert_eq!(
            m.month_ticks(),
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
            ]
        );
    }

    #[test]
    fn empty_input_gives_empty_matrix() {
        let m = build_matrix(&[], "t", FillPolicy::Zero).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.observed_range(), None);
    }

    fn arb_readings() -> impl Strategy<Value = Vec<HourlyReading>> {
        // Unique (day, hour) keys within a 60-day window.
        proptest::collection::btree_map((0i64..60, 0u32..24), -500.0f64..500.0, 0..300).prop_map(|cells| {
            let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            cells
                .into_iter()
                .map(|((day, hour), value)| HourlyReading {
                    at: (base + chrono::Duration::days(day)).and_hms_opt(hour, 0, 0).unwrap(),
                    value,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn shape_and_exact_round_trip(readings in arb_readings()) {
            let m = build_matrix(&readings, "prop", FillPolicy::Zero).unwrap();
            let distinct: BTreeSet<NaiveDate> = readings.iter().map(|r| r.at.date()).collect();

            prop_assert_eq!(m.n_rows(), distinct.len());
            prop_assert!(m.dates().windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(m.observed_count(), readings.len());

            for r in &readings {
                let cell = m.cell_at(r.at.date(), r.at.hour() as usize).unwrap();
                prop_assert_eq!(cell, Cell::Observed(r.value));
            }
            for row in 0..m.n_rows() {
                for hour in 0..HOURS {
                    if m.cell(row, hour) == Some(Cell::Missing) {
                        prop_assert_eq!(m.value(row, hour), Some(0.0));
                    }
                }
            }
        }
    }
}
