use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::path::Path;

use crate::config::LoaderConfig;
use crate::detection::{DetectionLog, DetectionRecord, TIMESTAMP_FORMAT};
use crate::error::{Error, Result};
use crate::temporal::CountSeries;
use crate::time_series::ForecastResult;

/// Built-in timestamp layouts, tried in order after RFC 3339
const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a timestamp cell.
///
/// `extra_formats` are tried first; a format without time fields is read as
/// midnight of that date.
pub fn parse_timestamp(value: &str, extra_formats: &[String]) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in extra_formats {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Read a detection log from a delimited file with a header row
pub fn read_detections<P: AsRef<Path>>(path: P, config: &LoaderConfig) -> Result<DetectionLog> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::DataLoad(format!("cannot open {}: {}", path.display(), e)))?;

    let delimiter = u8::try_from(config.delimiter).map_err(|_| {
        Error::DataLoad(format!(
            "delimiter '{}' is not a single-byte character",
            config.delimiter
        ))
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::DataLoad(format!("cannot read header of {}: {}", path.display(), e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let timestamp_idx = columns
        .iter()
        .position(|c| c == &config.timestamp_column)
        .ok_or_else(|| {
            Error::DataLoad(format!(
                "{} has no '{}' column (found: {})",
                path.display(),
                config.timestamp_column,
                columns.join(", ")
            ))
        })?;
    let vehicle_idx = columns.iter().position(|c| c == &config.vehicle_column);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in rdr.records().enumerate() {
        let row = row + 1;
        let record = result
            .map_err(|e| Error::DataLoad(format!("malformed CSV at data row {}: {}", row, e)))?;

        let raw_ts = record.get(timestamp_idx).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts, &config.timestamp_formats);
        if timestamp.is_none() {
            if config.strict_timestamps {
                return Err(Error::DataLoad(format!(
                    "unparseable timestamp '{}' at data row {}",
                    raw_ts, row
                )));
            }
            log::warn!("data row {}: unparseable timestamp '{}'", row, raw_ts);
            skipped += 1;
        }

        let vehicle_id = vehicle_idx.and_then(|idx| record.get(idx)).map(|v| v.to_string());
        let extra = columns
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != timestamp_idx && Some(*i) != vehicle_idx)
            .map(|(_, (name, value))| (name.clone(), value.to_string()))
            .collect();

        records.push(DetectionRecord {
            timestamp,
            vehicle_id,
            extra,
        });
    }

    log::info!(
        "loaded {} detections from {} ({} without timestamp)",
        records.len(),
        path.display(),
        skipped
    );

    Ok(DetectionLog {
        columns,
        timestamp_column: config.timestamp_column.clone(),
        vehicle_column: vehicle_idx.map(|_| config.vehicle_column.clone()),
        records,
    })
}

/// Write a count series as `Time,<series name>`
pub fn write_count_series_csv<P: AsRef<Path>>(series: &CountSeries, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(["Time", series.name()])?;
    for point in series.iter() {
        wtr.write_record([
            point.time.format(TIMESTAMP_FORMAT).to_string(),
            point.count.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write a forecast as `Time,Forecast,Lower,Upper`
pub fn write_forecast_csv<P: AsRef<Path>>(forecast: &ForecastResult, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(["Time", "Forecast", "Lower", "Upper"])?;
    for point in &forecast.points {
        wtr.write_record([
            point.time.format(TIMESTAMP_FORMAT).to_string(),
            point.value.to_string(),
            point.lower.to_string(),
            point.upper.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
