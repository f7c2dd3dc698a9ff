//! Historical CSV ingest.
//!
//! Turns the `;`-separated indicator exports (spot prices, temperatures) into
//! hourly readings normalized into one reference zone.
//!
//! - **Strict schema**: the configured datetime/value columns must exist.
//! - **Fail fast**: an unparsable timestamp or value aborts the load with the
//!   offending line, nothing is coerced.
//! - Blank values are gaps, not errors: they are skipped and counted.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use csv::StringRecord;

use crate::domain::HourlyReading;
use crate::error::{PipelineError, Result};

/// Column layout of one historical file family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSource {
    pub datetime_column: String,
    pub value_column: String,
}

impl CsvSource {
    /// Spot-price export: offset-aware ISO timestamps in `datetime`, price in `value`.
    pub fn spot_prices() -> Self {
        Self {
            datetime_column: "datetime".to_string(),
            value_column: "value".to_string(),
        }
    }

    /// Temperature export: `dd/mm/yyyy HH:MM` local timestamps, value in `temperatura`.
    pub fn temperatures() -> Self {
        Self {
            datetime_column: "datetime".to_string(),
            value_column: "temperatura".to_string(),
        }
    }
}

/// Ingest output: readings plus bookkeeping used for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedReadings {
    pub source_name: String,
    pub readings: Vec<HourlyReading>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Load a historical CSV file.
pub fn load_readings(path: &Path, source: &CsvSource, zone: Tz) -> Result<LoadedReadings> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path.display(), e))?;
    let loaded = read_readings(&bytes, &path.display().to_string(), source, zone)?;
    tracing::info!(
        path = %path.display(),
        rows = loaded.rows_read,
        skipped = loaded.rows_skipped,
        "loaded historical readings"
    );
    Ok(loaded)
}

/// Parse CSV bytes already in memory.
pub fn read_readings(bytes: &[u8], source_name: &str, source: &CsvSource, zone: Tz) -> Result<LoadedReadings> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let malformed = |line: usize, message: String| PipelineError::MalformedRecord {
        source_name: source_name.to_string(),
        line,
        message,
    };

    let headers = reader
        .headers()
        .map_err(|e| malformed(1, format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let dt_idx = column_index(&header_map, &source.datetime_column).ok_or_else(|| {
        malformed(1, format!("missing required column: `{}`", source.datetime_column))
    })?;
    let value_idx = column_index(&header_map, &source.value_column)
        .ok_or_else(|| malformed(1, format!("missing required column: `{}`", source.value_column)))?;

    let mut readings = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = result.map_err(|e| malformed(line, format!("CSV parse error: {e}")))?;

        // A row cut short is malformed; only an empty field that is present is a gap.
        if record.len() <= dt_idx.max(value_idx) {
            return Err(malformed(
                line,
                format!("expected at least {} fields, found {}", dt_idx.max(value_idx) + 1, record.len()),
            ));
        }

        let raw_dt = field(&record, dt_idx).ok_or_else(|| malformed(line, "missing datetime".to_string()))?;
        let at = parse_timestamp(raw_dt, zone).map_err(|m| malformed(line, m))?;

        let Some(raw_value) = field(&record, value_idx) else {
            rows_skipped += 1;
            tracing::warn!(source = source_name, line, "blank value, treated as no observation");
            continue;
        };
        let value = parse_value(raw_value).map_err(|m| malformed(line, m))?;

        readings.push(HourlyReading { at, value });
    }

    Ok(LoadedReadings {
        source_name: source_name.to_string(),
        readings,
        rows_read,
        rows_skipped,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn column_index(header_map: &HashMap<String, usize>, name: &str) -> Option<usize> {
    header_map.get(&normalize_header_name(name)).copied()
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Offset-aware timestamps are converted into `zone`; naive ones are taken as
/// already expressed in `zone`.
fn parse_timestamp(s: &str, zone: Tz) -> Result<NaiveDateTime, String> {
    const AWARE: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
    const NAIVE: [&str; 5] = [
        "%d/%m/%Y %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&zone).naive_local());
    }
    for fmt in AWARE {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&zone).naive_local());
        }
    }
    for fmt in NAIVE {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    Err(format!(
        "invalid datetime '{s}'. Expected ISO 8601 with offset, YYYY-MM-DD HH:MM[:SS] or DD/MM/YYYY HH:MM."
    ))
}

fn parse_value(s: &str) -> Result<f64, String> {
    // `;`-separated Spanish exports may use a decimal comma.
    let normalized = if s.contains(',') && !s.contains('.') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    let v = normalized
        .parse::<f64>()
        .map_err(|_| format!("non-numeric value '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("non-finite value '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    const SPOT: &str = "\u{feff}id;name;geoid;geoname;value;datetime\n\
        600;Precio;8741;España;63.33;2024-01-01T00:00:00+01:00\n\
        600;Precio;8741;España;50.1;2024-01-01T01:00:00+01:00\n";

    #[test]
    fn spot_timestamps_convert_to_reference_zone() {
        let loaded = read_readings(SPOT.as_bytes(), "spot.csv", &CsvSource::spot_prices(), Tz::UTC).unwrap();
        assert_eq!(loaded.rows_read, 2);
        let first = loaded.readings[0];
        assert_eq!(first.at.date(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(first.at.hour(), 23);
        assert_eq!(first.value, 63.33);
    }

    #[test]
    fn temperatures_are_day_first_and_local() {
        let csv = "datetime;temperatura\n01/02/2024 05:00;3,5\n01/02/2024 06:00;\n01/02/2024 07:00;-1.25\n";
        let loaded = read_readings(csv.as_bytes(), "temperaturas.csv", &CsvSource::temperatures(), Tz::UTC).unwrap();
        assert_eq!(loaded.rows_read, 3);
        assert_eq!(loaded.rows_skipped, 1);
        assert_eq!(loaded.readings.len(), 2);
        assert_eq!(loaded.readings[0].at.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(loaded.readings[0].value, 3.5);
        assert_eq!(loaded.readings[1].value, -1.25);
    }

    #[test]
    fn bad_timestamp_fails_with_line() {
        let csv = "datetime;value\n2024-01-01T00:00:00Z;1\nnot-a-date;2\n";
        let err = read_readings(csv.as_bytes(), "spot.csv", &CsvSource::spot_prices(), Tz::UTC).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { line: 3, .. }), "{err}");
    }

    #[test]
    fn non_numeric_value_fails() {
        let csv = "datetime;value\n2024-01-01T00:00:00Z;abc\n";
        assert!(matches!(
            read_readings(csv.as_bytes(), "spot.csv", &CsvSource::spot_prices(), Tz::UTC),
            Err(PipelineError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "fecha;value\n2024-01-01;1\n";
        let err = read_readings(csv.as_bytes(), "spot.csv", &CsvSource::spot_prices(), Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("datetime"), "{err}");
    }

    #[test]
    fn truncated_row_is_malformed_not_a_gap() {
        let csv = "datetime;temperatura\n01/02/2024 05:00;3.5\n01/02/2024 06:00\n";
        let err = read_readings(csv.as_bytes(), "temperaturas.csv", &CsvSource::temperatures(), Tz::UTC).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { line: 3, .. }), "{err}");
    }

    #[test]
    fn row_missing_datetime_column_is_malformed() {
        // Value column first, row stops before the datetime column.
        let csv = "value;datetime\n1.0\n";
        let err = read_readings(csv.as_bytes(), "spot.csv", &CsvSource::spot_prices(), Tz::UTC).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { line: 2, .. }), "{err}");
    }

    #[test]
    fn same_file_in_two_zones_gives_different_readings() {
        let csv = "datetime;value\n2024-03-19T23:00:00+00:00;10\n";
        let utc = read_readings(csv.as_bytes(), "spot.csv", &CsvSource::spot_prices(), Tz::UTC).unwrap();
        let madrid = read_readings(csv.as_bytes(), "spot.csv", &CsvSource::spot_prices(), chrono_tz::Europe::Madrid).unwrap();
        assert_eq!(utc.readings[0].at.date(), NaiveDate::from_ymd_opt(2024, 3, 19).unwrap());
        assert_eq!(madrid.readings[0].at.date(), NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        assert_ne!(
            crate::matrix::fingerprint(&utc.readings),
            crate::matrix::fingerprint(&madrid.readings)
        );
    }
}
