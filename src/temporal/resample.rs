use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::detection::DetectionLog;
use crate::error::{Error, Result};
use crate::temporal::{bin_start, CountSeries, Frequency};

/// Resampling of a detection log into fixed-width bins
#[derive(Debug)]
pub struct Resample<'a> {
    /// Source records
    log: &'a DetectionLog,

    /// Bin width
    frequency: Frequency,
}

impl<'a> Resample<'a> {
    pub fn new(log: &'a DetectionLog, frequency: Frequency) -> Self {
        Resample { log, frequency }
    }

    /// Hourly resampling
    pub fn hourly(log: &'a DetectionLog) -> Self {
        Self::new(log, Frequency::Hourly)
    }

    /// Count records per bin.
    ///
    /// Bins without records are absent from the result; see
    /// [`CountSeries::fill_gaps`].
    pub fn count(&self) -> Result<CountSeries> {
        let width = self.frequency.fixed_width().ok_or_else(|| {
            Error::Aggregation(format!(
                "frequency {} has no fixed bin width",
                self.frequency
            ))
        })?;

        if !self.log.has_timestamp_column() {
            return Err(Error::Aggregation(format!(
                "timestamp column '{}' is missing",
                self.log.timestamp_column
            )));
        }

        let mut bins: BTreeMap<NaiveDateTime, u64> = BTreeMap::new();
        let mut skipped = 0usize;

        for record in &self.log.records {
            match record.timestamp {
                Some(ts) => *bins.entry(bin_start(ts, width)?).or_insert(0) += 1,
                None => skipped += 1,
            }
        }

        if !self.log.is_empty() && bins.is_empty() {
            return Err(Error::Aggregation(format!(
                "timestamp column '{}' has no parseable values",
                self.log.timestamp_column
            )));
        }
        if skipped > 0 {
            log::warn!(
                "{} of {} records without a timestamp were left out of the counts",
                skipped,
                self.log.len()
            );
        }

        let (timestamps, counts) = bins.into_iter().unzip();
        CountSeries::new(timestamps, counts, self.frequency.clone())
    }

    /// Count records per bin over a contiguous range, with empty bins as zero
    pub fn count_filled(&self) -> Result<CountSeries> {
        self.count()?.fill_gaps()
    }
}
