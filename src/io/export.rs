//! CSV exports of pipeline outputs.
//!
//! Both files use the same `;` separator as the historical inputs so they can be
//! opened in the same spreadsheets. Gaps are written as empty fields.

use std::path::Path;

use crate::domain::{Indicator, MergedDataset};
use crate::error::{PipelineError, Result};
use crate::matrix::{CalendarMatrix, HOURS};

/// Write a calendar matrix as `date;h00;...;h23`, one row per date.
///
/// Cells are read with the matrix fill policy; a `NaN` sentinel becomes an
/// empty field.
pub fn write_matrix_csv(path: &Path, matrix: &CalendarMatrix) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(|e| PipelineError::io(path.display(), e))?;

    let mut header = Vec::with_capacity(HOURS + 1);
    header.push("date".to_string());
    header.extend((0..HOURS).map(|h| format!("h{h:02}")));
    writer
        .write_record(&header)
        .map_err(|e| PipelineError::io(path.display(), e))?;

    for (row, date) in matrix.dates().iter().enumerate() {
        let Some(values) = matrix.row_values(row) else { continue };
        let mut record = Vec::with_capacity(HOURS + 1);
        record.push(date.to_string());
        record.extend(values.iter().map(|&v| fmt_number(Some(v))));
        writer
            .write_record(&record)
            .map_err(|e| PipelineError::io(path.display(), e))?;
    }

    writer.flush().map_err(|e| PipelineError::io(path.display(), e))?;
    tracing::info!(path = %path.display(), rows = matrix.n_rows(), "wrote matrix CSV");
    Ok(())
}

/// Write the merged short-horizon series, one row per timestamp.
pub fn write_merged_csv(path: &Path, dataset: &MergedDataset) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(|e| PipelineError::io(path.display(), e))?;

    let mut header = vec!["datetime".to_string()];
    header.extend(Indicator::ALL.iter().map(|i| i.column_name().to_string()));
    header.push("renewable".to_string());
    header.push("estimated_price".to_string());
    writer
        .write_record(&header)
        .map_err(|e| PipelineError::io(path.display(), e))?;

    for rec in &dataset.records {
        let mut record = vec![rec.timestamp.to_rfc3339()];
        record.extend(Indicator::ALL.iter().map(|&i| fmt_number(rec.value(i))));
        record.push(fmt_number(rec.renewable));
        record.push(fmt_number(rec.estimated_price));
        writer
            .write_record(&record)
            .map_err(|e| PipelineError::io(path.display(), e))?;
    }

    writer.flush().map_err(|e| PipelineError::io(path.display(), e))?;
    tracing::info!(path = %path.display(), rows = dataset.records.len(), "wrote merged CSV");
    Ok(())
}

fn fmt_number(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FillPolicy, HourlyReading};
    use crate::matrix::build_matrix;
    use chrono::NaiveDate;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("esios-heatmap-{}-{name}", std::process::id()))
    }

    fn readings() -> Vec<HourlyReading> {
        let day = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        vec![
            HourlyReading {
                at: day.and_hms_opt(0, 0, 0).unwrap(),
                value: 42.5,
            },
            HourlyReading {
                at: day.and_hms_opt(23, 0, 0).unwrap(),
                value: 0.0,
            },
        ]
    }

    #[test]
    fn matrix_csv_has_hour_columns_and_zero_fill() {
        let matrix = build_matrix(&readings(), "spot", FillPolicy::Zero).unwrap();
        let path = temp_path("matrix-zero.csv");
        write_matrix_csv(&path, &matrix).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("date;h00;h01"));
        assert!(lines[0].ends_with(";h23"));
        let fields: Vec<&str> = lines[1].split(';').collect();
        assert_eq!(fields.len(), 25);
        assert_eq!(fields[0], "2024-03-20");
        assert_eq!(fields[1], "42.5");
        assert_eq!(fields[2], "0");
    }

    #[test]
    fn nan_fill_is_written_as_empty() {
        let matrix = build_matrix(&readings(), "spot", FillPolicy::Nan).unwrap();
        let path = temp_path("matrix-nan.csv");
        write_matrix_csv(&path, &matrix).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let fields: Vec<&str> = text.lines().nth(1).unwrap().split(';').collect();
        assert_eq!(fields[2], "");
        // An observed zero stays a zero.
        assert_eq!(fields[24], "0");
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let matrix = build_matrix(&readings(), "spot", FillPolicy::Zero).unwrap();
        let path = Path::new("/nonexistent-dir/matrix.csv");
        assert!(matches!(write_matrix_csv(path, &matrix), Err(PipelineError::Io { .. })));
    }
}
