//! Calendar overlays for the heatmaps and the short-horizon charts.
//!
//! - weekend shading intervals (`weekends`)
//! - national public holidays (`holidays`)
//! - approximate season-change dates (`seasons`)

pub mod holidays;
pub mod seasons;
pub mod weekends;

pub use holidays::*;
pub use seasons::*;
pub use weekends::*;
