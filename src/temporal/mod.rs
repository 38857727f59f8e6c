//! Time binning and arrival-count series

mod frequency;
mod resample;

use chrono::{DateTime, Duration, NaiveDateTime};
use serde::Serialize;

use crate::detection::{render_table, TIMESTAMP_FORMAT};
use crate::error::{Error, Result};

pub use self::frequency::Frequency;
pub use self::resample::Resample;

/// Column label of aggregated counts
pub const ARRIVAL_COUNT: &str = "Arrival_Count";

/// Truncate a timestamp to the start of its bin.
///
/// Bins are aligned to the Unix epoch, so hourly bins start on the clock hour,
/// daily bins at midnight and weekly bins on Thursday.
pub fn bin_start(timestamp: NaiveDateTime, width: Duration) -> Result<NaiveDateTime> {
    let width_secs = width.num_seconds();
    if width_secs <= 0 {
        return Err(Error::InvalidValue(format!(
            "bin width must be positive, got {} seconds",
            width_secs
        )));
    }

    let secs = timestamp.and_utc().timestamp();
    let floored = secs.div_euclid(width_secs) * width_secs;
    DateTime::from_timestamp(floored, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| Error::InvalidValue(format!("timestamp out of range: {}", timestamp)))
}

/// One bin of a count series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountPoint {
    pub time: NaiveDateTime,
    pub count: u64,
}

/// Chronologically ordered bin starts mapped to event counts
#[derive(Debug, Clone, PartialEq)]
pub struct CountSeries {
    timestamps: Vec<NaiveDateTime>,
    counts: Vec<u64>,
    name: String,
    frequency: Frequency,
}

impl CountSeries {
    /// Create a series; timestamps must be strictly increasing
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        counts: Vec<u64>,
        frequency: Frequency,
    ) -> Result<Self> {
        if timestamps.len() != counts.len() {
            return Err(Error::InvalidValue(format!(
                "timestamp length ({}) does not match count length ({})",
                timestamps.len(),
                counts.len()
            )));
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(Error::InvalidValue(format!(
                "timestamps must be strictly increasing; {} is followed by {}",
                timestamps[pos],
                timestamps[pos + 1]
            )));
        }

        Ok(CountSeries {
            timestamps,
            counts,
            name: ARRIVAL_COUNT.to_string(),
            frequency,
        })
    }

    /// Build from `(timestamp, count)` pairs
    pub fn from_pairs(pairs: &[(NaiveDateTime, u64)], frequency: Frequency) -> Result<Self> {
        let (timestamps, counts) = pairs.iter().cloned().unzip();
        Self::new(timestamps, counts, frequency)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the count column
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Counts as floating point observations
    pub fn values(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| c as f64).collect()
    }

    /// Count recorded for `timestamp`, if that bin is present
    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<u64> {
        self.timestamps
            .binary_search(timestamp)
            .ok()
            .map(|idx| self.counts[idx])
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = CountPoint> + '_ {
        self.timestamps
            .iter()
            .zip(self.counts.iter())
            .map(|(&time, &count)| CountPoint { time, count })
    }

    pub fn points(&self) -> Vec<CountPoint> {
        self.iter().collect()
    }

    /// Whether every consecutive pair of bins is exactly one step apart
    pub fn is_contiguous(&self) -> bool {
        let step = self.frequency.to_duration();
        self.timestamps.windows(2).all(|w| w[1] - w[0] == step)
    }

    /// Reindex over the full range from the first to the last bin, filling
    /// absent bins with zero.
    pub fn fill_gaps(&self) -> Result<Self> {
        let step = self.frequency.fixed_width().ok_or_else(|| {
            Error::Aggregation(format!(
                "cannot reindex a series with calendar frequency {}",
                self.frequency
            ))
        })?;

        let (first, last) = match (self.first_timestamp(), self.last_timestamp()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(self.clone()),
        };

        let mut timestamps = Vec::new();
        let mut counts = Vec::new();
        let mut source = self.iter().peekable();
        let mut current = first;

        while current <= last {
            let count = match source.peek() {
                Some(point) if point.time == current => {
                    let c = point.count;
                    source.next();
                    c
                }
                _ => 0,
            };
            timestamps.push(current);
            counts.push(count);
            current += step;
        }

        // Bins off the step grid would be silently dropped above
        if source.next().is_some() {
            return Err(Error::Aggregation(
                "series bins are not aligned to its frequency".to_string(),
            ));
        }

        Ok(CountSeries {
            timestamps,
            counts,
            name: self.name.clone(),
            frequency: self.frequency.clone(),
        })
    }

    /// Keep bins within `[start, end]`
    pub fn filter_by_time(&self, start: &NaiveDateTime, end: &NaiveDateTime) -> Self {
        let (timestamps, counts) = self
            .iter()
            .filter(|p| &p.time >= start && &p.time <= end)
            .map(|p| (p.time, p.count))
            .unzip();

        CountSeries {
            timestamps,
            counts,
            name: self.name.clone(),
            frequency: self.frequency.clone(),
        }
    }

    /// Render the first `n` bins as a plain-text table
    pub fn head(&self, n: usize) -> String {
        let mut rows = vec![vec!["Time".to_string(), self.name.clone()]];
        for point in self.iter().take(n) {
            rows.push(vec![
                point.time.format(TIMESTAMP_FORMAT).to_string(),
                point.count.to_string(),
            ]);
        }
        render_table(&rows)
    }
}
