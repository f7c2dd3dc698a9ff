//! Shared heatmap pipeline logic used by every CLI subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! short-horizon merge -> historical matrices -> sun/season/weekend/holiday overlays
//!
//! The pipeline never fetches or reads files on its own: callers hand it
//! already-loaded inputs, so the same code runs against the live API, fixture
//! files or test stubs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{self, HolidayCalendar};
use crate::data::IndicatorSource;
use crate::domain::{
    ColorScale, DateRange, Indicator, IndicatorSample, MatrixFamily, MergedDataset, PipelineConfig, SunSample,
    WeekendInterval,
};
use crate::error::{PipelineError, Result};
use crate::io::ingest::LoadedReadings;
use crate::matrix::CalendarMatrix;
use crate::memo::{Memo, MemoKey};
use crate::sun::SunEphemeris;

/// One historical file family, already loaded.
#[derive(Debug, Clone)]
pub struct HistoricalInput {
    pub family: MatrixFamily,
    pub loaded: LoadedReadings,
}

/// Everything a single build needs.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Short-horizon window; weekends and holidays are computed over it.
    pub range: DateRange,
    pub short_horizon: BTreeMap<Indicator, Vec<IndicatorSample>>,
    pub historical: Vec<HistoricalInput>,
}

/// A calendar matrix plus the annotations drawn on top of it.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixPanel {
    pub family: MatrixFamily,
    pub color_scale: ColorScale,
    pub matrix: Arc<CalendarMatrix>,
    pub month_ticks: Vec<NaiveDate>,
    /// Present only when the season overlay is enabled.
    pub season_boundaries: Option<Vec<NaiveDate>>,
}

/// All computed outputs of a single pipeline build.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapDataset {
    pub range: DateRange,
    pub short_horizon: MergedDataset,
    pub panels: Vec<MatrixPanel>,
    /// Present only when the sun overlay is enabled.
    pub sun: Option<Arc<Vec<SunSample>>>,
    pub weekends: Vec<WeekendInterval>,
    pub holidays: Arc<BTreeSet<NaiveDate>>,
}

impl HeatmapDataset {
    pub fn panel(&self, family: MatrixFamily) -> Option<&MatrixPanel> {
        self.panels.iter().find(|p| p.family == family)
    }
}

/// Composes the pure stages and memoizes the expensive ones.
///
/// Memo tables live as long as the pipeline value; repeated builds with the
/// same historical content or sun window reuse earlier results.
pub struct HeatmapPipeline {
    config: PipelineConfig,
    ephemeris: SunEphemeris,
    holidays: Box<dyn HolidayCalendar>,
    sun_memo: Memo<Vec<SunSample>>,
    matrix_memo: Memo<CalendarMatrix>,
    holiday_memo: Memo<BTreeSet<NaiveDate>>,
}

impl HeatmapPipeline {
    /// Pipeline with the built-in holiday calendar for `config.region`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let holidays = calendar::calendar_for_region(&config.region)?;
        Self::with_holiday_calendar(config, holidays)
    }

    pub fn with_holiday_calendar(config: PipelineConfig, holidays: Box<dyn HolidayCalendar>) -> Result<Self> {
        if config.sun_step_days == 0 {
            return Err(PipelineError::config("sun sampling step must be at least one day"));
        }
        Ok(Self {
            ephemeris: SunEphemeris::new(config.location),
            config,
            holidays,
            sun_memo: Memo::new(),
            matrix_memo: Memo::new(),
            holiday_memo: Memo::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the full dataset.
    pub fn build(&self, inputs: &PipelineInputs) -> Result<HeatmapDataset> {
        let span = tracing::info_span!("build", start = %inputs.range.start, end = %inputs.range.end);
        let _enter = span.enter();

        // 1) Merge the short-horizon indicators.
        let short_horizon = crate::merge::merge(&inputs.short_horizon, &self.config.coefficients)?;
        tracing::info!(records = short_horizon.records.len(), "merged short-horizon series");

        // 2) Historical matrices with their overlays.
        let panels = inputs
            .historical
            .iter()
            .map(|input| self.panel(input))
            .collect::<Result<Vec<_>>>()?;

        // 3) Sun curve over the broad window.
        let sun = if self.config.overlay_sun {
            Some(self.sun_times()?)
        } else {
            None
        };

        // 4) Calendar shading for the short-horizon window.
        let weekends = calendar::weekends_in_range(&inputs.range);
        let holidays = self.holidays(&inputs.range)?;
        tracing::info!(weekends = weekends.len(), holidays = holidays.len(), "calendar overlays ready");

        Ok(HeatmapDataset {
            range: inputs.range,
            short_horizon,
            panels,
            sun,
            weekends,
            holidays,
        })
    }

    /// Matrix panel for one historical family.
    pub fn panel(&self, input: &HistoricalInput) -> Result<MatrixPanel> {
        let matrix = self.matrix(input)?;
        let season_boundaries = self
            .config
            .overlay_seasons
            .then(|| calendar::season_boundaries(matrix.dates().iter().copied()));
        tracing::info!(
            family = input.family.label(),
            rows = matrix.n_rows(),
            observed = matrix.observed_count(),
            "matrix panel ready"
        );
        Ok(MatrixPanel {
            family: input.family,
            color_scale: input.family.color_scale(),
            month_ticks: matrix.month_ticks(),
            season_boundaries,
            matrix,
        })
    }

    /// Calendar matrix of one loaded file, memoized on its normalized readings.
    pub fn matrix(&self, input: &HistoricalInput) -> Result<Arc<CalendarMatrix>> {
        let loaded = &input.loaded;
        let fill = self.config.fill_policy;
        let key = MemoKey::new(
            "build_matrix",
            &(input.family, crate::matrix::fingerprint(&loaded.readings), fill),
        )?;
        self.matrix_memo.get_or_try_insert(key, || {
            crate::matrix::build_matrix(&loaded.readings, &loaded.source_name, fill)
        })
    }

    /// Sunrise/sunset samples over the configured broad window.
    pub fn sun_times(&self) -> Result<Arc<Vec<SunSample>>> {
        let window = self.config.sun_window;
        let step = self.config.sun_step_days;
        let loc = self.ephemeris.location();
        let key = MemoKey::new(
            "compute_sun_times",
            &(window.start, window.end, step, loc.latitude, loc.longitude, loc.zone.name()),
        )?;
        self.sun_memo
            .get_or_try_insert(key, || self.ephemeris.compute_sun_times(window.start, window.end, step))
    }

    /// Holidays of the configured region inside `range`.
    pub fn holidays(&self, range: &DateRange) -> Result<Arc<BTreeSet<NaiveDate>>> {
        let key = MemoKey::new("holidays_in_range", &(self.holidays.region(), range.start, range.end))?;
        self.holiday_memo
            .get_or_try_insert(key, || Ok(calendar::holidays_in_range(range, self.holidays.as_ref())))
    }
}

/// Fetch the four short-horizon indicators from `source`.
///
/// The spot price is published per market; only the configured geographic
/// scope is kept for it. Any failing indicator aborts the whole fetch.
pub fn fetch_short_horizon(
    source: &dyn IndicatorSource,
    range: &DateRange,
    config: &PipelineConfig,
) -> Result<BTreeMap<Indicator, Vec<IndicatorSample>>> {
    let mut out = BTreeMap::new();
    for indicator in Indicator::ALL {
        let geo = match indicator {
            Indicator::SpotPrice => Some(config.spot_geo_name.as_str()),
            _ => None,
        };
        let samples = source.fetch(indicator, range, geo)?;
        tracing::info!(%indicator, samples = samples.len(), "indicator fetched");
        out.insert(indicator, samples);
    }
    Ok(out)
}
