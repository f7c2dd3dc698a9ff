//! Outer join of the short-horizon indicator series.
//!
//! Series are joined on exact instant equality. Reconciling different sampling
//! granularities is the fetch side's job; nothing here resamples.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::domain::{EstimationCoefficients, Indicator, IndicatorSample, MergedDataset, MergedRecord};
use crate::error::{PipelineError, Result};

/// Merge named series into one record per distinct timestamp.
///
/// The map key is authoritative for which column a sample fills. Output is
/// sorted by instant and does not depend on the order of samples in each series.
///
/// # Errors
/// - `DuplicateTimestamp` if one series carries two samples for the same instant.
/// - `MalformedRecord` if a sample value is not finite.
pub fn merge(
    series: &BTreeMap<Indicator, Vec<IndicatorSample>>,
    coefficients: &EstimationCoefficients,
) -> Result<MergedDataset> {
    let mut rows: BTreeMap<DateTime<Utc>, (DateTime<Tz>, BTreeMap<Indicator, f64>)> = BTreeMap::new();

    for (&indicator, samples) in series {
        for (idx, sample) in samples.iter().enumerate() {
            if !sample.value.is_finite() {
                return Err(PipelineError::MalformedRecord {
                    source_name: indicator.to_string(),
                    line: idx + 1,
                    message: format!("non-finite value at {}", sample.timestamp),
                });
            }

            let key = sample.timestamp.with_timezone(&Utc);
            let (_, values) = rows
                .entry(key)
                .or_insert_with(|| (sample.timestamp, BTreeMap::new()));
            if values.insert(indicator, sample.value).is_some() {
                return Err(PipelineError::DuplicateTimestamp {
                    indicator: indicator.to_string(),
                    timestamp: sample.timestamp.to_rfc3339(),
                });
            }
        }
    }

    let records: Vec<MergedRecord> = rows
        .into_values()
        .map(|(timestamp, values)| {
            let renewable = renewable(values.get(&Indicator::Wind).copied(), values.get(&Indicator::Solar).copied());
            let estimated_price = estimated_price(renewable, values.get(&Indicator::Demand).copied(), coefficients);
            MergedRecord {
                timestamp,
                values,
                renewable,
                estimated_price,
            }
        })
        .collect();

    let bounds = match (records.first(), records.last()) {
        (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
        _ => None,
    };

    tracing::debug!(
        series = series.len(),
        records = records.len(),
        "merged short-horizon indicators"
    );

    Ok(MergedDataset { records, bounds })
}

/// `wind + solar`, missing if either is missing.
pub fn renewable(wind: Option<f64>, solar: Option<f64>) -> Option<f64> {
    Some(wind? + solar?)
}

/// Linear price estimate from the renewable/demand ratio.
///
/// Missing or zero demand, a missing renewable total, or a non-finite result all
/// yield `None`.
pub fn estimated_price(
    renewable: Option<f64>,
    demand: Option<f64>,
    coefficients: &EstimationCoefficients,
) -> Option<f64> {
    let demand = demand.filter(|d| *d != 0.0)?;
    let price = renewable? / demand * coefficients.slope + coefficients.intercept;
    price.is_finite().then_some(price)
}
