//! Statistics over arrival-count series
//!
//! Descriptive summaries, peak detection and the Poisson model of hourly
//! arrival counts.

pub mod descriptive;
pub mod poisson;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::temporal::CountSeries;

pub use poisson::PoissonFit;

/// Compute descriptive statistics
///
/// # Example
/// ```rust
/// use vehicle_arrivals::stats;
///
/// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let stats = stats::describe(&data).unwrap();
/// assert_eq!(stats.mean, 3.0);
/// ```
pub fn describe<T: AsRef<[f64]>>(data: T) -> Result<DescriptiveStats> {
    descriptive::describe_impl(data.as_ref())
}

/// Descriptive statistics of a sample
#[derive(Debug, Clone, Serialize)]
pub struct DescriptiveStats {
    /// Number of observations
    pub count: usize,
    /// Mean
    pub mean: f64,
    /// Variance (unbiased)
    pub variance: f64,
    /// Standard deviation (unbiased)
    pub std: f64,
    /// Minimum
    pub min: f64,
    /// 25th percentile
    pub q1: f64,
    /// Median
    pub median: f64,
    /// 75th percentile
    pub q3: f64,
    /// Maximum
    pub max: f64,
}

/// Busiest bin of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Peak {
    pub time: NaiveDateTime,
    pub count: u64,
}

/// Find the bin with the highest count.
///
/// When several bins share the maximum, the earliest one is returned.
pub fn peak(series: &CountSeries) -> Result<Peak> {
    let mut best: Option<Peak> = None;
    for point in series.iter() {
        match best {
            Some(current) if point.count <= current.count => {}
            _ => {
                best = Some(Peak {
                    time: point.time,
                    count: point.count,
                })
            }
        }
    }

    best.ok_or_else(|| Error::EmptySeries("cannot find the peak of an empty series".to_string()))
}
