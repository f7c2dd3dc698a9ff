//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - indicator streams and their merged rows (`Indicator`, `IndicatorSample`, `MergedRecord`)
//! - historical readings and overlay values (`HourlyReading`, `SunSample`, `WeekendInterval`)
//! - pipeline configuration (`PipelineConfig`, `ObserverLocation`, `EstimationCoefficients`)

pub mod types;

pub use types::*;
