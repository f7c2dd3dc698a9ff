//! `esios-heatmap` library crate.
//!
//! The binary (`heatmap`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes or hitting the API
//! - the pure stages (merge, matrix, calendar, sun) are reusable from other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calendar;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod matrix;
pub mod memo;
pub mod merge;
pub mod report;
pub mod sun;
