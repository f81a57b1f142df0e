//! CSV dataset loading for metered member readings.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::community::Reading;
use crate::config::DatasetConfig;
use crate::error::DatasetError;

/// Timestamp layouts tried in order when no explicit format is configured.
pub const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Parses a timestamp cell.
///
/// With `format` set, only that layout is accepted. Otherwise the
/// [`FALLBACK_FORMATS`] are tried, then RFC 3339 (offset dropped, local
/// wall-clock time kept).
pub fn parse_timestamp(value: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Some(fmt) = format {
        return NaiveDateTime::parse_from_str(value, fmt).ok();
    }
    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

struct Columns {
    member: usize,
    timestamp: usize,
    consumption: usize,
    own_generation: usize,
    shared_generation: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, cfg: &DatasetConfig) -> Result<Self, DatasetError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            member: find(&cfg.member_column)?,
            timestamp: find(&cfg.timestamp_column)?,
            consumption: find(&cfg.consumption_column)?,
            own_generation: find(&cfg.own_generation_column)?,
            shared_generation: find(&cfg.shared_generation_column)?,
        })
    }
}

fn energy(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
    line: u64,
) -> Result<f64, DatasetError> {
    let raw = record.get(idx).unwrap_or("").trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DatasetError::Energy {
            line,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Reads readings from CSV data with a header row.
///
/// Extra columns are ignored. Rows keep their file order.
///
/// # Errors
///
/// Returns a `DatasetError` for a missing configured column, an unparseable
/// timestamp, a blank member, or a negative or non-numeric energy cell.
pub fn read_readings(reader: impl Read, cfg: &DatasetConfig) -> Result<Vec<Reading>, DatasetError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let cols = Columns::locate(rdr.headers()?, cfg)?;
    let format = cfg.timestamp_format.as_deref();

    let mut readings = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);

        let member = record.get(cols.member).unwrap_or("");
        if member.is_empty() {
            return Err(DatasetError::EmptyMember { line });
        }
        let raw_ts = record.get(cols.timestamp).unwrap_or("");
        let Some(timestamp) = parse_timestamp(raw_ts, format) else {
            return Err(DatasetError::Timestamp {
                line,
                value: raw_ts.to_string(),
            });
        };

        let cell = |idx: usize, column: &str| energy(&record, idx, column, line);
        readings.push(Reading::new(
            member,
            timestamp,
            cell(cols.consumption, &cfg.consumption_column)?,
            cell(cols.own_generation, &cfg.own_generation_column)?,
            cell(cols.shared_generation, &cfg.shared_generation_column)?,
        ));
    }
    Ok(readings)
}

/// Loads readings from the CSV file at `path`.
///
/// # Errors
///
/// Returns [`DatasetError::Io`] if the file cannot be opened, or any error
/// of [`read_readings`].
pub fn load_readings(path: &Path, cfg: &DatasetConfig) -> Result<Vec<Reading>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let readings = read_readings(io::BufReader::new(file), cfg)?;
    tracing::info!(
        path = %path.display(),
        readings = readings.len(),
        "dataset loaded"
    );
    Ok(readings)
}

/// Keeps readings whose calendar day lies in `[start, end]`.
///
/// A missing bound leaves that side open.
pub fn filter_window(
    readings: Vec<Reading>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Reading> {
    readings
        .into_iter()
        .filter(|r| {
            let day = r.timestamp.date();
            start.is_none_or(|s| day >= s) && end.is_none_or(|e| day <= e)
        })
        .collect()
}
