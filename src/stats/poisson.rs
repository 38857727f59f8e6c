//! Poisson model of per-bin arrival counts
//!
//! The rate is the sample mean of the counts. Counts are assumed independent
//! and identically Poisson distributed; no goodness-of-fit test is run, but
//! the dispersion index is reported so over- or under-dispersion is visible.

use serde::Serialize;
use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::stats::describe;
use crate::temporal::CountSeries;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)]
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the Gamma function (Lanczos approximation)
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() || z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z <= 0.0 && (z - z.round()).abs() < 1e-15 {
        return f64::NAN;
    }
    if z < 0.5 {
        // Reflection
        let sin_pi = (PI * z).sin();
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// log(n!)
pub fn log_factorial(n: u64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    log_gamma(n as f64 + 1.0)
}

fn check_rate(lambda: f64) -> Result<()> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(Error::InvalidValue(format!(
            "Poisson rate must be finite and non-negative, got {}",
            lambda
        )));
    }
    Ok(())
}

/// P(X = k) for X ~ Poisson(lambda)
pub fn pmf(k: u64, lambda: f64) -> Result<f64> {
    check_rate(lambda)?;
    if lambda == 0.0 {
        return Ok(if k == 0 { 1.0 } else { 0.0 });
    }
    let log_p = k as f64 * lambda.ln() - lambda - log_factorial(k);
    Ok(log_p.exp().clamp(0.0, 1.0))
}

/// P(X <= k) for X ~ Poisson(lambda)
pub fn cdf(k: u64, lambda: f64) -> Result<f64> {
    let mut total = 0.0;
    for i in 0..=k {
        total += pmf(i, lambda)?;
    }
    Ok(total.min(1.0))
}

/// Poisson model fitted to a count series
#[derive(Debug, Clone, Serialize)]
pub struct PoissonFit {
    /// Mean count per bin
    pub lambda: f64,
    /// Sample variance of the counts
    pub variance: f64,
    /// variance / mean; `None` when the mean is zero
    pub dispersion_index: Option<f64>,
    /// Count values the PMF was evaluated at (`0..=max_count`)
    pub support: Vec<u64>,
    /// P(X = k) for each value in `support`
    pub pmf: Vec<f64>,
    /// Probability mass above the largest observed count
    pub tail_mass: f64,
}

impl PoissonFit {
    /// Largest count the PMF covers
    pub fn max_count(&self) -> u64 {
        self.support.last().copied().unwrap_or(0)
    }

    /// Value with the highest probability
    pub fn mode(&self) -> u64 {
        self.support
            .iter()
            .zip(self.pmf.iter())
            .fold((0u64, f64::NEG_INFINITY), |best, (&k, &p)| {
                if p > best.1 {
                    (k, p)
                } else {
                    best
                }
            })
            .0
    }
}

/// Fit a Poisson model to the counts of `series`
pub fn fit(series: &CountSeries) -> Result<PoissonFit> {
    if series.is_empty() {
        return Err(Error::EmptySeries(
            "cannot fit a Poisson model to an empty series".to_string(),
        ));
    }

    let summary = describe(series.values())?;
    let lambda = summary.mean;
    let max_count = series.counts().iter().copied().max().unwrap_or(0);

    let support: Vec<u64> = (0..=max_count).collect();
    let pmf = support
        .iter()
        .map(|&k| pmf(k, lambda))
        .collect::<Result<Vec<f64>>>()?;

    let covered: f64 = pmf.iter().sum();
    let tail_mass = (1.0 - covered).max(0.0);
    let dispersion_index = if lambda > 0.0 {
        Some(summary.variance / lambda)
    } else {
        None
    };

    log::debug!(
        "Poisson fit: lambda={:.4}, dispersion={:?}, tail_mass={:.3e}",
        lambda,
        dispersion_index,
        tail_mass
    );

    Ok(PoissonFit {
        lambda,
        variance: summary.variance,
        dispersion_index,
        support,
        pmf,
        tail_mass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::Frequency;
    use chrono::{Duration, NaiveDate};

    fn series_of(counts: &[u64]) -> CountSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps = (0..counts.len())
            .map(|i| start + Duration::hours(i as i64))
            .collect();
        CountSeries::new(timestamps, counts.to_vec(), Frequency::Hourly).unwrap()
    }

    #[test]
    fn test_log_factorial_known_values() {
        assert_eq!(log_factorial(0), 0.0);
        assert_eq!(log_factorial(1), 0.0);
        assert!((log_factorial(5) - 120f64.ln()).abs() < 1e-10);
        assert!((log_factorial(10) - 3_628_800f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_pmf_matches_closed_form() {
        // e^-2 * 2^3 / 3!
        let expected = (-2.0f64).exp() * 8.0 / 6.0;
        assert!((pmf(3, 2.0).unwrap() - expected).abs() < 1e-12);
        assert!((pmf(0, 1.5).unwrap() - (-1.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_pmf_zero_rate() {
        assert_eq!(pmf(0, 0.0).unwrap(), 1.0);
        assert_eq!(pmf(4, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_pmf_large_rate_does_not_underflow() {
        let p = pmf(800, 800.0).unwrap();
        assert!(p > 0.0 && p < 0.02);
    }

    #[test]
    fn test_invalid_rate() {
        assert!(matches!(pmf(1, -1.0), Err(Error::InvalidValue(_))));
        assert!(matches!(pmf(1, f64::NAN), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_cdf_approaches_one() {
        assert!((cdf(60, 10.0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_uses_mean_and_observed_range() {
        let fit = fit(&series_of(&[2, 1])).unwrap();
        assert!((fit.lambda - 1.5).abs() < 1e-12);
        assert_eq!(fit.support, vec![0, 1, 2]);
        assert_eq!(fit.pmf.len(), 3);
        assert_eq!(fit.max_count(), 2);
        assert_eq!(fit.mode(), 1);

        let sum: f64 = fit.pmf.iter().sum();
        assert!((sum + fit.tail_mass - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_all_zero_counts() {
        let fit = fit(&series_of(&[0, 0, 0])).unwrap();
        assert_eq!(fit.lambda, 0.0);
        assert_eq!(fit.pmf, vec![1.0]);
        assert_eq!(fit.dispersion_index, None);
        assert_eq!(fit.tail_mass, 0.0);
    }

    #[test]
    fn test_dispersion_index() {
        // mean 2, unbiased variance 2
        let fit = fit(&series_of(&[0, 2, 4, 2, 2])).unwrap();
        assert!((fit.dispersion_index.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_empty_series_fails() {
        let empty = CountSeries::new(vec![], vec![], Frequency::Hourly).unwrap();
        assert!(matches!(fit(&empty), Err(Error::EmptySeries(_))));
    }
}
