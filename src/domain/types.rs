//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages without copying through adapters
//! - exported to JSON/CSV
//! - asserted on directly in tests

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use clap::ValueEnum;
use serde::Serialize;

use crate::error::{PipelineError, Result};

/// One named short-horizon measurement stream.
///
/// The discriminant order is the column order used in reports and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Wind generation forecast.
    Wind,
    /// Photovoltaic generation forecast.
    Solar,
    /// Weekly demand forecast.
    Demand,
    /// Day-ahead spot price.
    SpotPrice,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [
        Indicator::Wind,
        Indicator::Solar,
        Indicator::Demand,
        Indicator::SpotPrice,
    ];

    /// Identifier of the series on the ESIOS indicator API.
    pub fn esios_id(self) -> u32 {
        match self {
            Indicator::Wind => 541,
            Indicator::Solar => 542,
            Indicator::SpotPrice => 600,
            Indicator::Demand => 603,
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            Indicator::Wind => "wind",
            Indicator::Solar => "solar",
            Indicator::Demand => "demand",
            Indicator::SpotPrice => "spot_price",
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.column_name(), self.esios_id())
    }
}

/// A single time-stamped reading of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSample {
    pub timestamp: DateTime<Tz>,
    pub value: f64,
    pub indicator: Indicator,
}

/// One row of the outer-joined short-horizon dataset.
///
/// `None` marks "no value at this instant" for raw series and an arithmetic gap
/// for the derived columns. It is never encoded as `0` or `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub timestamp: DateTime<Tz>,
    pub values: BTreeMap<Indicator, f64>,
    pub renewable: Option<f64>,
    pub estimated_price: Option<f64>,
}

impl MergedRecord {
    pub fn value(&self, indicator: Indicator) -> Option<f64> {
        self.values.get(&indicator).copied()
    }
}

/// Merged records plus their timestamp bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedDataset {
    pub records: Vec<MergedRecord>,
    pub bounds: Option<(DateTime<Tz>, DateTime<Tz>)>,
}

/// A historical reading already normalized into the reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyReading {
    pub at: NaiveDateTime,
    pub value: f64,
}

/// How calendar-matrix cells without an observation are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FillPolicy {
    /// Read gaps as `0.0`.
    ///
    /// Kept for compatibility with the historical heatmaps; a zero-filled gap is
    /// indistinguishable from an observed zero when only reading values.
    #[default]
    Zero,
    /// Read gaps as `NaN` so renderers can leave them blank.
    Nan,
}

impl FillPolicy {
    pub fn sentinel(self) -> f64 {
        match self {
            FillPolicy::Zero => 0.0,
            FillPolicy::Nan => f64::NAN,
        }
    }
}

/// Sunrise/sunset for one date, as fractional hours of the observer's zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SunSample {
    pub date: NaiveDate,
    pub sunrise_hour: f64,
    pub sunset_hour: f64,
}

/// Half-open shading interval covering one weekend day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekendInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WeekendInterval {
    pub fn for_day(day: NaiveDate) -> Self {
        let start = day.and_time(chrono::NaiveTime::MIN);
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.start.date()
    }
}

/// Fixed observer used by the sun overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverLocation {
    /// Geodetic latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// Zone in which event times are reported.
    pub zone: Tz,
}

impl Default for ObserverLocation {
    /// Madrid, reporting event times in UTC.
    fn default() -> Self {
        Self {
            latitude: 40.4165,
            longitude: -3.70256,
            zone: Tz::UTC,
        }
    }
}

/// Linear fit relating the renewable/demand ratio to the market price.
///
/// `estimated_price = renewable / demand * slope + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimationCoefficients {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for EstimationCoefficients {
    fn default() -> Self {
        Self {
            slope: -144.27,
            intercept: 127.12,
        }
    }
}

/// Color scale hint handed to the renderer together with a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorScale {
    Turbo,
    #[serde(rename = "RdBu_r")]
    RedBlueReversed,
}

/// Historical indicator family rendered as a calendar heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatrixFamily {
    SpotPrice,
    Temperature,
}

impl MatrixFamily {
    pub fn label(self) -> &'static str {
        match self {
            MatrixFamily::SpotPrice => "spot price",
            MatrixFamily::Temperature => "temperature",
        }
    }

    pub fn color_scale(self) -> ColorScale {
        match self {
            MatrixFamily::SpotPrice => ColorScale::Turbo,
            MatrixFamily::Temperature => ColorScale::RedBlueReversed,
        }
    }
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PipelineError::config(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `today - lookback ..= today + lookahead`.
    ///
    /// Fails with `Config` when either bound leaves the representable calendar.
    pub fn around(today: NaiveDate, lookback_days: u32, lookahead_days: u32) -> Result<Self> {
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .ok_or_else(|| PipelineError::config(format!("lookback of {lookback_days} days from {today} is out of range")))?;
        let end = today
            .checked_add_days(Days::new(u64::from(lookahead_days)))
            .ok_or_else(|| PipelineError::config(format!("lookahead of {lookahead_days} days from {today} is out of range")))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }
}

/// Explicit configuration for one pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub location: ObserverLocation,
    pub coefficients: EstimationCoefficients,
    pub fill_policy: FillPolicy,
    /// Attach season-boundary dates to every matrix panel.
    pub overlay_seasons: bool,
    /// Compute the sunrise/sunset overlay.
    pub overlay_sun: bool,
    /// Broad window of the sun overlay, independent of the query range.
    pub sun_window: DateRange,
    pub sun_step_days: u32,
    /// ISO country code used for holiday lookup.
    pub region: String,
    pub lookback_days: u32,
    pub lookahead_days: u32,
    /// Geographic scope kept from the spot-price indicator.
    pub spot_geo_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            location: ObserverLocation::default(),
            coefficients: EstimationCoefficients::default(),
            fill_policy: FillPolicy::Zero,
            overlay_seasons: true,
            overlay_sun: true,
            sun_window: DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
                end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MIN),
            },
            sun_step_days: 15,
            region: "ES".to_string(),
            lookback_days: 5,
            lookahead_days: 10,
            spot_geo_name: "España".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_around_today_spans_lookback_and_lookahead() {
        let r = DateRange::around(d(2025, 1, 3), 5, 10).unwrap();
        assert_eq!(r.start, d(2024, 12, 29));
        assert_eq!(r.end, d(2025, 1, 13));
        assert_eq!(r.years(), 2024..=2025);
        assert_eq!(r.days().count(), 16);
    }

    #[test]
    fn huge_lookback_or_lookahead_is_a_config_error() {
        assert!(matches!(
            DateRange::around(d(2025, 1, 3), u32::MAX, 10),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            DateRange::around(d(2025, 1, 3), 5, u32::MAX),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            DateRange::new(d(2025, 2, 1), d(2025, 1, 1)),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn weekend_interval_covers_one_day() {
        let w = WeekendInterval::for_day(d(2025, 11, 1));
        assert_eq!(w.end - w.start, Duration::days(1));
        assert_eq!(w.day(), d(2025, 11, 1));
    }

    #[test]
    fn indicator_ids_match_esios_catalogue() {
        let ids: Vec<u32> = Indicator::ALL.iter().map(|i| i.esios_id()).collect();
        assert_eq!(ids, vec![541, 542, 603, 600]);
    }
}
