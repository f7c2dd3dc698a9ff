//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - parses CLI arguments
//! - loads inputs (ESIOS API, historical CSVs)
//! - runs the pipeline
//! - prints reports and writes optional exports

use std::path::Path;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, MatrixArgs, ObserverArgs, RunArgs, SunArgs};
use crate::data::{EsiosClient, EsiosConfig};
use crate::domain::{DateRange, MatrixFamily, ObserverLocation, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::io::ingest::{CsvSource, LoadedReadings, load_readings};
use crate::sun::SunEphemeris;

pub mod pipeline;

use pipeline::{HeatmapPipeline, HistoricalInput, PipelineInputs};

/// Entry point for the `heatmap` binary.
pub fn run() -> Result<()> {
    init_tracing();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Matrix(args) => handle_matrix(args),
        Command::Sun(args) => handle_sun(args),
    }
}

/// Logs go to stderr so stdout stays the report. `RUST_LOG` overrides the
/// default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<()> {
    let config = pipeline_config_from_args(&args);
    let today = args
        .today
        .unwrap_or_else(|| Utc::now().with_timezone(&args.market_zone).date_naive());
    let range = DateRange::around(today, config.lookback_days, config.lookahead_days)?;

    // 1) Short-horizon indicators from the API.
    let client = EsiosClient::new(EsiosConfig::from_env(args.market_zone)?);
    let short_horizon = pipeline::fetch_short_horizon(&client, &range, &config)?;

    // 2) Historical files, when given.
    let mut historical = Vec::new();
    if let Some(path) = &args.spot {
        historical.push(load_family(path, MatrixFamily::SpotPrice, args.matrix_zone)?);
    }
    if let Some(path) = &args.temperature {
        historical.push(load_family(path, MatrixFamily::Temperature, args.matrix_zone)?);
    }

    // 3) Build.
    let pipeline = HeatmapPipeline::new(config)?;
    let inputs = PipelineInputs {
        range,
        short_horizon,
        historical,
    };
    let dataset = pipeline.build(&inputs)?;

    println!("{}", crate::report::format_run_summary(&dataset));
    println!("{}", crate::report::format_short_horizon(&dataset.short_horizon));

    // 4) Optional exports.
    if let Some(dir) = &args.export_dir {
        export_all(dir, &dataset)?;
    }

    Ok(())
}

fn handle_matrix(args: MatrixArgs) -> Result<()> {
    let loaded = load_family(&args.input, args.family, args.matrix_zone)?.loaded;
    let matrix = crate::matrix::build_matrix(&loaded.readings, &loaded.source_name, args.fill)?;

    println!("{}", crate::report::format_matrix_summary(&loaded, &matrix));

    if let Some(path) = &args.export {
        crate::io::export::write_matrix_csv(path, &matrix)?;
    }
    Ok(())
}

fn handle_sun(args: SunArgs) -> Result<()> {
    let ephemeris = SunEphemeris::new(observer_location(&args.observer));
    let samples = ephemeris.compute_sun_times(args.start, args.end, args.step)?;
    print!("{}", crate::report::format_sun_table(&samples));
    Ok(())
}

pub fn pipeline_config_from_args(args: &RunArgs) -> PipelineConfig {
    PipelineConfig {
        location: observer_location(&args.observer),
        fill_policy: args.fill,
        overlay_seasons: !args.no_seasons,
        overlay_sun: !args.no_sun,
        region: args.region.clone(),
        lookback_days: args.lookback,
        lookahead_days: args.lookahead,
        ..PipelineConfig::default()
    }
}

fn observer_location(args: &ObserverArgs) -> ObserverLocation {
    ObserverLocation {
        latitude: args.latitude,
        longitude: args.longitude,
        zone: args.sun_zone,
    }
}

fn load_family(path: &Path, family: MatrixFamily, zone: chrono_tz::Tz) -> Result<HistoricalInput> {
    let source = match family {
        MatrixFamily::SpotPrice => CsvSource::spot_prices(),
        MatrixFamily::Temperature => CsvSource::temperatures(),
    };
    let loaded: LoadedReadings = load_readings(path, &source, zone)?;
    Ok(HistoricalInput { family, loaded })
}

/// Write every export into `dir`, creating it if needed.
pub fn export_all(dir: &Path, dataset: &pipeline::HeatmapDataset) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir.display(), e))?;

    crate::io::export::write_merged_csv(&dir.join("short_horizon.csv"), &dataset.short_horizon)?;
    for panel in &dataset.panels {
        let name = match panel.family {
            MatrixFamily::SpotPrice => "matrix_spot_price.csv",
            MatrixFamily::Temperature => "matrix_temperature.csv",
        };
        crate::io::export::write_matrix_csv(&dir.join(name), &panel.matrix)?;
    }
    crate::io::dataset::write_dataset_json(&dir.join("dataset.json"), dataset)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FillPolicy;
    use crate::io::ingest::read_readings;

    fn run_args(argv: &[&str]) -> RunArgs {
        match crate::cli::Cli::parse_from(argv).command {
            Command::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn sun_zone_only_reaches_the_observer() {
        let args = run_args(&["heatmap", "run", "--sun-zone", "Europe/Madrid", "--fill", "nan"]);
        let config = pipeline_config_from_args(&args);
        assert_eq!(config.location.zone, chrono_tz::Europe::Madrid);
        assert_eq!(config.fill_policy, FillPolicy::Nan);
        assert_eq!(args.matrix_zone, chrono_tz::Tz::UTC);
    }

    #[test]
    fn autumn_clock_change_pivots_cleanly_in_default_matrix_zone() {
        // 00:00Z and 01:00Z on 27 Oct 2024 are both 02:00 in Madrid.
        let csv = "datetime;value\n2024-10-27T00:00:00+00:00;61.2\n2024-10-27T01:00:00+00:00;58.9\n";
        let args = run_args(&["heatmap", "run", "--sun-zone", "Europe/Madrid"]);
        let source = CsvSource::spot_prices();

        let loaded = read_readings(csv.as_bytes(), "spot.csv", &source, args.matrix_zone).unwrap();
        let matrix = crate::matrix::build_matrix(&loaded.readings, "spot.csv", args.fill).unwrap();
        assert_eq!(matrix.value(0, 0), Some(61.2));
        assert_eq!(matrix.value(0, 1), Some(58.9));

        let local = read_readings(csv.as_bytes(), "spot.csv", &source, chrono_tz::Europe::Madrid).unwrap();
        assert!(matches!(
            crate::matrix::build_matrix(&local.readings, "spot.csv", args.fill),
            Err(PipelineError::DuplicateKey { hour: 2, .. })
        ));
    }
}
