//! Formatted terminal output.
//!
//! Formatting lives in one place so the pipeline stays free of presentation
//! details and output changes are localized.

use crate::app::pipeline::{HeatmapDataset, MatrixPanel};
use crate::domain::{Indicator, MergedDataset, SunSample};
use crate::io::ingest::LoadedReadings;
use crate::matrix::CalendarMatrix;

use super::{coverage, estimated_price_stats};

/// Format the full run summary: window, merged series, panels and overlays.
pub fn format_run_summary(dataset: &HeatmapDataset) -> String {
    let mut out = String::new();

    out.push_str("=== heatmap - ESIOS calendar matrices ===\n");
    out.push_str(&format!("Window: {} .. {}\n", dataset.range.start, dataset.range.end));

    let merged = &dataset.short_horizon;
    out.push_str(&format!("Short horizon: {} records", merged.records.len()));
    if let Some((first, last)) = &merged.bounds {
        out.push_str(&format!(" | {} .. {}", first.to_rfc3339(), last.to_rfc3339()));
    }
    out.push('\n');
    if let Some(s) = estimated_price_stats(merged) {
        out.push_str(&format!(
            "Estimated price: n={} | min={:.2} max={:.2} mean={:.2} EUR/MWh\n",
            s.n, s.min, s.max, s.mean
        ));
    }

    if !dataset.panels.is_empty() {
        out.push_str("\nMatrices:\n");
        for panel in &dataset.panels {
            out.push_str(&format_panel_line(panel));
        }
    }

    out.push_str("\nOverlays:\n");
    match &dataset.sun {
        Some(sun) => out.push_str(&format!("- sun: {} samples\n", sun.len())),
        None => out.push_str("- sun: off\n"),
    }
    out.push_str(&format!(
        "- weekends: {}\n",
        join_dates(dataset.weekends.iter().map(|w| w.day()))
    ));
    out.push_str(&format!(
        "- holidays: {}\n",
        join_dates(dataset.holidays.iter().copied())
    ));

    out
}

fn format_panel_line(panel: &MatrixPanel) -> String {
    let m = &panel.matrix;
    let mut line = format!(
        "- {:<12} {} days x {} h | coverage={:.1}%",
        panel.family.label(),
        m.n_rows(),
        m.n_cols(),
        coverage(m) * 100.0
    );
    if let Some((lo, hi)) = m.observed_range() {
        line.push_str(&format!(" | range=[{lo:.2}, {hi:.2}]"));
    }
    if let Some(seasons) = &panel.season_boundaries {
        line.push_str(&format!(" | seasons={}", seasons.len()));
    }
    line.push('\n');
    line
}

/// Format the merged short-horizon series as a table, gaps shown as `-`.
pub fn format_short_horizon(merged: &MergedDataset) -> String {
    let mut out = String::new();

    let mut header = format!("{:<25}", "datetime");
    for indicator in Indicator::ALL {
        header.push_str(&format!(" {:>11}", indicator.column_name()));
    }
    header.push_str(&format!(" {:>11} {:>11}", "renewable", "est_price"));
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(25 + 12 * (Indicator::ALL.len() + 2)));
    out.push('\n');

    for rec in &merged.records {
        let mut line = format!("{:<25}", rec.timestamp.to_rfc3339());
        for indicator in Indicator::ALL {
            line.push_str(&format!(" {:>11}", fmt_opt(rec.value(indicator))));
        }
        line.push_str(&format!(
            " {:>11} {:>11}",
            fmt_opt(rec.renewable),
            fmt_opt(rec.estimated_price)
        ));
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Format sunrise/sunset samples as `HH:MM` columns.
pub fn format_sun_table(samples: &[SunSample]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<12} {:>8} {:>8}\n", "date", "sunrise", "sunset"));
    out.push_str(&format!("{:-<12} {:-<8} {:-<8}\n", "", "", ""));
    for s in samples {
        out.push_str(&format!(
            "{:<12} {:>8} {:>8}\n",
            s.date.to_string(),
            fmt_hour(s.sunrise_hour),
            fmt_hour(s.sunset_hour)
        ));
    }
    out
}

/// One-file summary used by the offline `matrix` command.
pub fn format_matrix_summary(loaded: &LoadedReadings, matrix: &CalendarMatrix) -> String {
    let mut out = String::new();
    out.push_str(&format!("Source: {}\n", loaded.source_name));
    out.push_str(&format!(
        "Rows: read={} skipped={} | readings={}\n",
        loaded.rows_read,
        loaded.rows_skipped,
        loaded.readings.len()
    ));
    out.push_str(&format!(
        "Matrix: {} days x {} h | coverage={:.1}%\n",
        matrix.n_rows(),
        matrix.n_cols(),
        coverage(matrix) * 100.0
    ));
    if let (Some(first), Some(last)) = (matrix.dates().first(), matrix.dates().last()) {
        out.push_str(&format!("Dates: {first} .. {last}\n"));
    }
    if let Some((lo, hi)) = matrix.observed_range() {
        out.push_str(&format!("Values: [{lo:.2}, {hi:.2}]\n"));
    }
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".to_string())
}

/// `4.7333` -> `04:44`. Fractional hours carry whole minutes only.
fn fmt_hour(h: f64) -> String {
    let total_minutes = (h * 60.0).round() as i64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

fn join_dates<I>(dates: I) -> String
where
    I: Iterator<Item = chrono::NaiveDate>,
{
    let parts: Vec<String> = dates.map(|d| d.format("%m-%d").to_string()).collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}
