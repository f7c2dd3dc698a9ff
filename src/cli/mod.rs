//! Command-line parsing for the ESIOS heatmap pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code. Every flag maps onto a `PipelineConfig` field or an input path.

use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};

use crate::domain::{FillPolicy, MatrixFamily};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "heatmap", version, about = "ESIOS indicator aggregation and calendar-matrix heatmaps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch short-horizon indicators, load historical files and build the full dataset.
    Run(RunArgs),
    /// Build a single calendar matrix from a historical CSV (offline).
    Matrix(MatrixArgs),
    /// Print sunrise/sunset hours for the observer.
    Sun(SunArgs),
}

/// Observer and display options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct ObserverArgs {
    /// Observer latitude in degrees (north positive).
    #[arg(long, default_value_t = 40.4165, allow_hyphen_values = true)]
    pub latitude: f64,

    /// Observer longitude in degrees (east positive).
    #[arg(long, default_value_t = -3.70256, allow_hyphen_values = true)]
    pub longitude: f64,

    /// IANA zone sunrise/sunset times are reported in.
    #[arg(long, default_value = "UTC")]
    pub sun_zone: Tz,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub observer: ObserverArgs,

    /// Historical spot-price CSV (`datetime;value`).
    #[arg(long, value_name = "CSV")]
    pub spot: Option<PathBuf>,

    /// Historical temperature CSV (`datetime;temperatura`).
    #[arg(long, value_name = "CSV")]
    pub temperature: Option<PathBuf>,

    /// Zone historical timestamps are converted into before pivoting.
    ///
    /// Kept apart from `--sun-zone`: a zone with clock changes folds two
    /// instants onto one local hour each autumn.
    #[arg(long, default_value = "UTC")]
    pub matrix_zone: Tz,

    /// Zone the ESIOS request window and short-horizon timestamps are expressed in.
    #[arg(long, default_value = "Europe/Madrid")]
    pub market_zone: Tz,

    /// Centre of the short-horizon window (defaults to today in the market zone).
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Days before `today` included in the short-horizon window.
    #[arg(long, default_value_t = 5)]
    pub lookback: u32,

    /// Days after `today` included in the short-horizon window.
    #[arg(long, default_value_t = 10)]
    pub lookahead: u32,

    /// Holiday calendar region (ISO country code).
    #[arg(long, default_value = "ES")]
    pub region: String,

    /// How missing matrix cells are read back.
    #[arg(long, value_enum, default_value_t = FillPolicy::Zero)]
    pub fill: FillPolicy,

    /// Skip season-boundary markers on the matrices.
    #[arg(long)]
    pub no_seasons: bool,

    /// Skip the sunrise/sunset overlay.
    #[arg(long)]
    pub no_sun: bool,

    /// Directory for matrix/merged CSV and dataset JSON exports.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct MatrixArgs {
    /// Historical CSV to pivot.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Which file family the CSV belongs to (selects the column layout).
    #[arg(long, value_enum, default_value_t = MatrixFamily::SpotPrice)]
    pub family: MatrixFamily,

    /// Zone timestamps are converted into before pivoting.
    #[arg(long, default_value = "UTC")]
    pub matrix_zone: Tz,

    #[arg(long, value_enum, default_value_t = FillPolicy::Zero)]
    pub fill: FillPolicy,

    /// Write the matrix as CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SunArgs {
    #[command(flatten)]
    pub observer: ObserverArgs,

    /// First date sampled.
    #[arg(long, default_value = "2024-01-01")]
    pub start: NaiveDate,

    /// Last date that may be sampled.
    #[arg(long, default_value = "2025-12-31")]
    pub end: NaiveDate,

    /// Days between samples.
    #[arg(long, default_value_t = 15)]
    pub step: u32,
}
