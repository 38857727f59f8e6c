//! Forecaster interface and forecast results

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::temporal::CountSeries;

/// A model that can be fitted to a count series and extrapolate it
pub trait Forecaster {
    /// Estimate model parameters from `series`
    fn fit(&mut self, series: &CountSeries) -> Result<()>;

    /// Forecast `horizon` steps past the end of the fitted series
    fn forecast(&self, horizon: usize, confidence_level: f64) -> Result<ForecastResult>;

    /// Model name
    fn name(&self) -> &str;

    /// Fitted parameters by name
    fn parameters(&self) -> BTreeMap<String, f64>;
}

/// One forecast step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub time: NaiveDateTime,
    /// Point forecast; may be negative or fractional
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Goodness-of-fit measures of a fitted model
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForecastMetrics {
    pub sigma2: Option<f64>,
    pub log_likelihood: Option<f64>,
    pub aic: Option<f64>,
    pub aicc: Option<f64>,
    pub bic: Option<f64>,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
}

/// Forecast of a fitted model
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    /// Model that produced the forecast
    pub method: String,
    /// Fitted parameters
    pub parameters: BTreeMap<String, f64>,
    /// Coverage of the `lower`/`upper` bounds
    pub confidence_level: f64,
    /// Forecast steps in time order
    pub points: Vec<ForecastPoint>,
    pub metrics: ForecastMetrics,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.points.iter().map(|p| p.time).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// z-score for a two-sided interval at `confidence_level`
pub(crate) fn get_z_score(confidence_level: f64) -> f64 {
    normal_quantile(0.5 + confidence_level / 2.0)
}

/// Standard normal quantile (probit), Abramowitz and Stegun 26.2.23.
///
/// Absolute error is below 4.5e-4.
fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if (p - 0.5).abs() < 1e-12 {
        return 0.0;
    }

    let tail = if p < 0.5 { p } else { 1.0 - p };
    let t = (-2.0 * tail.ln()).sqrt();

    const C: [f64; 3] = [2.515517, 0.802853, 0.010328];
    const D: [f64; 3] = [1.432788, 0.189269, 0.001308];
    let approx = t
        - (C[0] + C[1] * t + C[2] * t * t) / (1.0 + D[0] * t + D[1] * t * t + D[2] * t * t * t);

    if p < 0.5 {
        -approx
    } else {
        approx
    }
}
