// Descriptive statistics

use crate::error::{Error, Result};
use crate::stats::DescriptiveStats;

/// Internal implementation of [`crate::stats::describe`]
pub(crate) fn describe_impl(data: &[f64]) -> Result<DescriptiveStats> {
    if data.is_empty() {
        return Err(Error::EmptySeries(
            "descriptive statistics need at least one observation".into(),
        ));
    }

    let count = data.len();
    let mean = data.iter().sum::<f64>() / count as f64;

    // Unbiased estimator
    let variance = if count > 1 {
        let sum_squared_diff = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>();
        sum_squared_diff / (count - 1) as f64
    } else {
        0.0
    };
    let std = variance.sqrt();

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let min = sorted[0];
    let max = sorted[count - 1];

    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);

    Ok(DescriptiveStats {
        count,
        mean,
        variance,
        std,
        min,
        q1,
        median,
        q3,
        max,
    })
}

/// Linear-interpolated percentile of sorted data
fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let n = sorted_data.len();
    let idx = p * (n - 1) as f64;
    let idx_floor = idx.floor() as usize;
    let idx_ceil = idx.ceil() as usize;

    if idx_floor == idx_ceil {
        return sorted_data[idx_floor];
    }

    let weight_ceil = idx - idx_floor as f64;
    let weight_floor = 1.0 - weight_ceil;

    sorted_data[idx_floor] * weight_floor + sorted_data[idx_ceil] * weight_ceil
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_counts() {
        let stats = describe_impl(&[2.0, 1.0, 0.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.count, 5);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.variance - 2.5).abs() < 1e-12);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.q1, 1.0);
        assert_eq!(stats.q3, 3.0);
    }

    #[test]
    fn test_single_observation_has_zero_variance() {
        let stats = describe_impl(&[7.0]).unwrap();
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_empty_data_fails() {
        assert!(matches!(describe_impl(&[]), Err(Error::EmptySeries(_))));
    }
}
