//! Remote data sources.
//!
//! - ESIOS indicator API (`esios`)

pub mod esios;

pub use esios::{EsiosClient, EsiosConfig, IndicatorSource};
