//! Input/output helpers.
//!
//! - historical CSV ingest (`ingest`)
//! - matrix and merged-series CSV exports (`export`)
//! - dataset JSON export (`dataset`)

pub mod dataset;
pub mod export;
pub mod ingest;

pub use dataset::*;
pub use export::*;
pub use ingest::*;
