//! Reporting utilities: summary statistics and formatted terminal output.

use crate::domain::MergedDataset;
use crate::matrix::{CalendarMatrix, HOURS};

pub mod format;

pub use format::*;

/// Min/max/mean of a numeric series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Stats over the finite values of `values`. `None` when there are none.
pub fn series_stats<I>(values: I) -> Option<SeriesStats>
where
    I: IntoIterator<Item = f64>,
{
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        n += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    (n > 0).then(|| SeriesStats {
        n,
        min,
        max,
        mean: sum / n as f64,
    })
}

pub fn estimated_price_stats(dataset: &MergedDataset) -> Option<SeriesStats> {
    series_stats(dataset.records.iter().filter_map(|r| r.estimated_price))
}

/// Share of matrix cells holding an observation, in `[0, 1]`.
pub fn coverage(matrix: &CalendarMatrix) -> f64 {
    let total = matrix.n_rows() * HOURS;
    if total == 0 {
        return 0.0;
    }
    matrix.observed_count() as f64 / total as f64
}
