//! Raw vehicle detection records as loaded from the input log

use chrono::NaiveDateTime;
use serde::Serialize;

/// Display format used for timestamps in previews and reports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One detection event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    /// Detection time; `None` when the cell could not be parsed in lenient mode
    pub timestamp: Option<NaiveDateTime>,
    /// Vehicle identifier, if the log has that column
    pub vehicle_id: Option<String>,
    /// Remaining columns in file order
    pub extra: Vec<(String, String)>,
}

impl DetectionRecord {
    /// Record with a timestamp and vehicle id only
    pub fn new(timestamp: NaiveDateTime, vehicle_id: impl Into<String>) -> Self {
        DetectionRecord {
            timestamp: Some(timestamp),
            vehicle_id: Some(vehicle_id.into()),
            extra: Vec::new(),
        }
    }
}

/// Ordered detection records plus the column layout they came from
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionLog {
    /// Header of the source file
    pub columns: Vec<String>,
    /// Name of the timestamp column
    pub timestamp_column: String,
    /// Name of the vehicle identifier column
    pub vehicle_column: Option<String>,
    /// Records in file order
    pub records: Vec<DetectionRecord>,
}

impl DetectionLog {
    /// Build a log from records with the conventional `Time` / `Vehicle_ID` layout
    pub fn from_records(records: Vec<DetectionRecord>) -> Self {
        DetectionLog {
            columns: vec!["Time".to_string(), "Vehicle_ID".to_string()],
            timestamp_column: "Time".to_string(),
            vehicle_column: Some("Vehicle_ID".to_string()),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the timestamp column is part of the layout
    pub fn has_timestamp_column(&self) -> bool {
        self.columns.iter().any(|c| c == &self.timestamp_column)
    }

    /// Number of records whose timestamp parsed
    pub fn timestamped_count(&self) -> usize {
        self.records.iter().filter(|r| r.timestamp.is_some()).count()
    }

    /// Render the first `n` records as a plain-text table
    pub fn head(&self, n: usize) -> String {
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(n + 1);
        rows.push(self.columns.clone());

        for record in self.records.iter().take(n) {
            let row = self
                .columns
                .iter()
                .map(|col| self.cell(record, col))
                .collect();
            rows.push(row);
        }

        render_table(&rows)
    }

    fn cell(&self, record: &DetectionRecord, column: &str) -> String {
        if column == self.timestamp_column {
            return record
                .timestamp
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_else(|| "NaT".to_string());
        }
        if self.vehicle_column.as_deref() == Some(column) {
            return record.vehicle_id.clone().unwrap_or_default();
        }
        record
            .extra
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }
}

/// Left-aligned table with a header separator
pub(crate) fn render_table(rows: &[Vec<String>]) -> String {
    let n_cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; n_cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    for (row_idx, row) in rows.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        output.push_str(line.join("  ").trim_end());
        output.push('\n');

        if row_idx == 0 {
            let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            output.push_str(&sep.join("  "));
            output.push('\n');
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_head_renders_header_and_rows() {
        let log = DetectionLog::from_records(vec![
            DetectionRecord::new(ts(0, 15), "V1"),
            DetectionRecord::new(ts(0, 45), "V2"),
            DetectionRecord::new(ts(1, 5), "V3"),
        ]);

        let table = log.head(2);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Time"));
        assert!(lines[0].contains("Vehicle_ID"));
        assert!(lines[2].contains("2023-01-01 00:15:00"));
        assert!(lines[3].contains("V2"));
        assert!(!table.contains("V3"));
    }

    #[test]
    fn test_unparsed_timestamp_shows_nat() {
        let mut log = DetectionLog::from_records(vec![DetectionRecord::new(ts(0, 0), "V1")]);
        log.records[0].timestamp = None;
        assert!(log.head(1).contains("NaT"));
        assert_eq!(log.timestamped_count(), 0);
    }
}
