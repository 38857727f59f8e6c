//! ARIMA(p,d,q) forecasting of count series
//!
//! Parameters are estimated by conditional sum of squares (CSS) on the
//! differenced series. The AR and MA coefficients are searched over an
//! unconstrained space and mapped through partial autocorrelations, so every
//! candidate is stationary and invertible. Prediction intervals come from the
//! psi-weights of the integrated model.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::temporal::CountSeries;
use crate::time_series::forecasting::{
    get_z_score, ForecastMetrics, ForecastPoint, ForecastResult, Forecaster,
};
use crate::time_series::optimize::{nelder_mead, NelderMeadOptions};

/// Model order (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// Autoregressive order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving-average order
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        ArimaOrder { p, d, q }
    }

    /// Shortest series the model accepts: at least one residual more than
    /// there are coefficients, and at least two points after differencing.
    pub fn min_observations(&self) -> usize {
        (self.d + 2 * self.p + self.q + 1).max(self.d + 2)
    }

    /// Estimated parameters, including the innovation variance
    pub fn n_params(&self) -> usize {
        self.p + self.q + 1 + usize::from(self.d == 0)
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        ArimaOrder::new(1, 1, 1)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ArimaOrder {
    type Err = Error;

    /// Parse `p,d,q`, optionally wrapped in parentheses
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = trimmed.split(',').map(|p| p.trim()).collect();
        if parts.len() != 3 {
            return Err(Error::InvalidValue(format!(
                "ARIMA order must be 'p,d,q', got '{}'",
                s
            )));
        }

        let parse = |part: &str| {
            part.parse::<usize>().map_err(|_| {
                Error::InvalidValue(format!("invalid ARIMA order component '{}'", part))
            })
        };
        Ok(ArimaOrder::new(
            parse(parts[0])?,
            parse(parts[1])?,
            parse(parts[2])?,
        ))
    }
}

/// Apply `order` rounds of first differencing
pub fn difference(values: &[f64], order: usize) -> Vec<f64> {
    let mut result = values.to_vec();
    for _ in 0..order {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo differencing for values that continue a series.
///
/// `last_levels[k]` is the final value of the series differenced `k` times.
pub fn integrate(last_levels: &[f64], diffs: &[f64]) -> Vec<f64> {
    let mut levels = last_levels.to_vec();
    diffs
        .iter()
        .map(|&x| {
            let mut value = x;
            for level in levels.iter_mut().rev() {
                *level += value;
                value = *level;
            }
            value
        })
        .collect()
}

/// Final value of the series at each differencing level below `d`
fn last_levels(values: &[f64], d: usize) -> Vec<f64> {
    let mut levels = Vec::with_capacity(d);
    let mut current = values.to_vec();
    for _ in 0..d {
        levels.push(current.last().copied().unwrap_or(0.0));
        current = difference(&current, 1);
    }
    levels
}

/// Map unconstrained reals to the coefficients of a lag polynomial
/// `1 + a_1 z + ... + a_n z^n` whose roots lie outside the unit circle.
fn constrain_polynomial(unconstrained: &[f64]) -> Vec<f64> {
    let mut coeffs: Vec<f64> = Vec::with_capacity(unconstrained.len());
    for (k, &u) in unconstrained.iter().enumerate() {
        let r = u.tanh();
        let prev = coeffs.clone();
        for i in 0..k {
            coeffs[i] = prev[i] + r * prev[k - 1 - i];
        }
        coeffs.push(r);
    }
    coeffs
}

/// Split an unconstrained parameter vector into (AR, MA) coefficients
fn split_params(x: &[f64], p: usize) -> (Vec<f64>, Vec<f64>) {
    let ar = constrain_polynomial(&x[..p]).into_iter().map(|a| -a).collect();
    let ma = constrain_polynomial(&x[p..]);
    (ar, ma)
}

/// One-step-ahead errors; the first `ar.len()` entries are zero
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut prediction = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            prediction += phi * w[t - i - 1];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                prediction += theta * e[t - j - 1];
            }
        }
        e[t] = w[t] - prediction;
    }
    e
}

fn css(w: &[f64], ar: &[f64], ma: &[f64]) -> f64 {
    css_residuals(w, ar, ma)[ar.len()..]
        .iter()
        .map(|e| e * e)
        .sum()
}

/// MA(infinity) weights of the integrated model
fn psi_weights(ar: &[f64], ma: &[f64], d: usize, horizon: usize) -> Vec<f64> {
    let mut psi = vec![0.0; horizon];
    if horizon == 0 {
        return psi;
    }
    psi[0] = 1.0;
    for j in 1..horizon {
        let mut value = if j <= ma.len() { ma[j - 1] } else { 0.0 };
        for i in 1..=ar.len().min(j) {
            value += ar[i - 1] * psi[j - i];
        }
        psi[j] = value;
    }
    for _ in 0..d {
        let mut acc = 0.0;
        for weight in psi.iter_mut() {
            acc += *weight;
            *weight = acc;
        }
    }
    psi
}

/// ARIMA model for hourly count series
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    order: ArimaOrder,
    options: NelderMeadOptions,
    /// AR coefficients (phi)
    ar_params: Option<Vec<f64>>,
    /// MA coefficients (theta)
    ma_params: Option<Vec<f64>>,
    /// Series mean, only estimated when d = 0
    intercept: f64,
    /// Differenced (and demeaned) series the ARMA part was fitted to
    working: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    last_levels: Vec<f64>,
    last_timestamp: Option<NaiveDateTime>,
    step: Duration,
    sigma2: Option<f64>,
    log_likelihood: Option<f64>,
    /// Residuals the likelihood is based on
    n_obs: usize,
    iterations: usize,
}

impl ArimaForecaster {
    pub fn new(order: ArimaOrder) -> Self {
        ArimaForecaster {
            order,
            options: NelderMeadOptions::default(),
            ar_params: None,
            ma_params: None,
            intercept: 0.0,
            working: None,
            residuals: None,
            last_levels: Vec::new(),
            last_timestamp: None,
            step: Duration::hours(1),
            sigma2: None,
            log_likelihood: None,
            n_obs: 0,
            iterations: 0,
        }
    }

    /// ARIMA(p, d, q)
    pub fn arima(p: usize, d: usize, q: usize) -> Self {
        Self::new(ArimaOrder::new(p, d, q))
    }

    /// Set the optimiser iteration budget
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.options.max_iterations = max_iterations;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn is_fitted(&self) -> bool {
        self.ar_params.is_some()
    }

    pub fn ar_params(&self) -> Option<&[f64]> {
        self.ar_params.as_deref()
    }

    pub fn ma_params(&self) -> Option<&[f64]> {
        self.ma_params.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Innovation variance
    pub fn sigma2(&self) -> Option<f64> {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }

    /// Optimiser iterations used by the last fit
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Akaike information criterion
    pub fn aic(&self) -> Option<f64> {
        self.log_likelihood
            .map(|ll| -2.0 * ll + 2.0 * self.order.n_params() as f64)
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> Option<f64> {
        self.log_likelihood
            .map(|ll| -2.0 * ll + self.order.n_params() as f64 * (self.n_obs as f64).ln())
    }

    /// AIC corrected for small samples
    pub fn aicc(&self) -> Option<f64> {
        self.aic().map(|aic| {
            let k = self.order.n_params() as f64;
            let n = self.n_obs as f64;
            if n - k - 1.0 > 0.0 {
                aic + (2.0 * k * (k + 1.0)) / (n - k - 1.0)
            } else {
                aic
            }
        })
    }

    /// In-sample one-step errors, excluding the conditioning values
    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals
            .as_deref()
            .map(|r| &r[self.order.p.min(r.len())..])
    }

    fn not_fitted() -> Error {
        Error::ModelFit("model has not been fitted".to_string())
    }

    fn metrics(&self) -> ForecastMetrics {
        let (mae, rmse) = match self.residuals() {
            Some(r) if !r.is_empty() => {
                let n = r.len() as f64;
                let mae = r.iter().map(|e| e.abs()).sum::<f64>() / n;
                let mse = r.iter().map(|e| e * e).sum::<f64>() / n;
                (Some(mae), Some(mse.sqrt()))
            }
            _ => (None, None),
        };

        ForecastMetrics {
            sigma2: self.sigma2,
            log_likelihood: self.log_likelihood,
            aic: self.aic(),
            aicc: self.aicc(),
            bic: self.bic(),
            mae,
            rmse,
        }
    }
}

impl Default for ArimaForecaster {
    fn default() -> Self {
        Self::new(ArimaOrder::default())
    }
}

impl Forecaster for ArimaForecaster {
    fn fit(&mut self, series: &CountSeries) -> Result<()> {
        let order = self.order;
        let min_len = order.min_observations();
        if series.len() < min_len {
            return Err(Error::ModelFit(format!(
                "series too short for ARIMA{}: need at least {} observations, got {}",
                order,
                min_len,
                series.len()
            )));
        }

        let step = series.frequency().fixed_width().ok_or_else(|| {
            Error::ModelFit(format!(
                "series frequency {} is not evenly spaced",
                series.frequency()
            ))
        })?;
        if !series.is_contiguous() {
            log::warn!("fitting ARIMA{} to a series with missing bins", order);
        }

        let values = series.values();
        let diffed = difference(&values, order.d);
        let intercept = if order.d == 0 {
            diffed.iter().sum::<f64>() / diffed.len() as f64
        } else {
            0.0
        };
        let working: Vec<f64> = diffed.iter().map(|v| v - intercept).collect();

        let first = working[0];
        if working.iter().all(|v| (v - first).abs() < 1e-12) {
            return Err(Error::ModelFit(format!(
                "series is constant after {} round(s) of differencing",
                order.d
            )));
        }

        let p = order.p;
        let objective = |x: &[f64]| {
            let (ar, ma) = split_params(x, p);
            css(&working, &ar, &ma)
        };
        let minimum = nelder_mead(objective, &vec![0.0; p + order.q], &self.options);
        if !minimum.converged {
            return Err(Error::ModelFit(format!(
                "ARIMA{} estimation did not converge within {} iterations",
                order, self.options.max_iterations
            )));
        }

        let (ar, ma) = split_params(&minimum.x, p);
        let residuals = css_residuals(&working, &ar, &ma);
        let n_obs = working.len() - p;
        let sum_sq: f64 = residuals[p..].iter().map(|e| e * e).sum();
        let sigma2 = sum_sq / n_obs as f64;
        if !sigma2.is_finite() || sigma2 <= 1e-12 {
            return Err(Error::ModelFit(format!(
                "degenerate ARIMA{} fit: residual variance is {}",
                order, sigma2
            )));
        }
        let log_likelihood =
            -0.5 * n_obs as f64 * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0);

        log::debug!(
            "ARIMA{} fitted in {} iterations: ar={:?} ma={:?} sigma2={:.4}",
            order,
            minimum.iterations,
            ar,
            ma,
            sigma2
        );

        self.ar_params = Some(ar);
        self.ma_params = Some(ma);
        self.intercept = intercept;
        self.working = Some(working);
        self.residuals = Some(residuals);
        self.last_levels = last_levels(&values, order.d);
        self.last_timestamp = series.last_timestamp();
        self.step = step;
        self.sigma2 = Some(sigma2);
        self.log_likelihood = Some(log_likelihood);
        self.n_obs = n_obs;
        self.iterations = minimum.iterations;

        Ok(())
    }

    fn forecast(&self, horizon: usize, confidence_level: f64) -> Result<ForecastResult> {
        let ar = self.ar_params.as_ref().ok_or_else(Self::not_fitted)?;
        let ma = self.ma_params.as_ref().ok_or_else(Self::not_fitted)?;
        let working = self.working.as_ref().ok_or_else(Self::not_fitted)?;
        let residuals = self.residuals.as_ref().ok_or_else(Self::not_fitted)?;
        let sigma2 = self.sigma2.ok_or_else(Self::not_fitted)?;
        let last_timestamp = self.last_timestamp.ok_or_else(Self::not_fitted)?;

        if horizon == 0 {
            return Err(Error::InvalidValue(
                "forecast horizon must be at least 1".to_string(),
            ));
        }
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(Error::InvalidValue(format!(
                "confidence level must be in (0, 1), got {}",
                confidence_level
            )));
        }

        // Recursive forecast with future shocks set to zero
        let mut w = working.clone();
        let mut e = residuals.clone();
        let mut diffs = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let t = w.len();
            let mut prediction = 0.0;
            for (i, phi) in ar.iter().enumerate() {
                prediction += phi * w[t - i - 1];
            }
            for (j, theta) in ma.iter().enumerate() {
                if t > j {
                    prediction += theta * e[t - j - 1];
                }
            }
            w.push(prediction);
            e.push(0.0);
            diffs.push(prediction + self.intercept);
        }
        let values = integrate(&self.last_levels, &diffs);

        let psi = psi_weights(ar, ma, self.order.d, horizon);
        let z = get_z_score(confidence_level);
        let mut cumulative = 0.0;
        let points = values
            .iter()
            .zip(psi.iter())
            .enumerate()
            .map(|(h, (&value, &weight))| {
                cumulative += weight * weight;
                let margin = z * (sigma2 * cumulative).sqrt();
                ForecastPoint {
                    time: last_timestamp + self.step * (h as i32 + 1),
                    value,
                    lower: value - margin,
                    upper: value + margin,
                }
            })
            .collect();

        Ok(ForecastResult {
            method: format!("{}{}", self.name(), self.order),
            parameters: self.parameters(),
            confidence_level,
            points,
            metrics: self.metrics(),
        })
    }

    fn name(&self) -> &str {
        "ARIMA"
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("p".to_string(), self.order.p as f64);
        params.insert("d".to_string(), self.order.d as f64);
        params.insert("q".to_string(), self.order.q as f64);
        if let Some(ar) = &self.ar_params {
            for (i, phi) in ar.iter().enumerate() {
                params.insert(format!("ar.L{}", i + 1), *phi);
            }
        }
        if let Some(ma) = &self.ma_params {
            for (i, theta) in ma.iter().enumerate() {
                params.insert(format!("ma.L{}", i + 1), *theta);
            }
        }
        if self.order.d == 0 && self.is_fitted() {
            params.insert("intercept".to_string(), self.intercept);
        }
        if let Some(sigma2) = self.sigma2 {
            params.insert("sigma2".to_string(), sigma2);
        }
        params
    }
}

/// Criterion for model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelectionCriterion {
    /// Akaike Information Criterion
    AIC,
    /// Corrected AIC (for small samples)
    AICc,
    /// Bayesian Information Criterion
    BIC,
}

impl Default for ModelSelectionCriterion {
    fn default() -> Self {
        ModelSelectionCriterion::AICc
    }
}

/// Result of model selection for a single candidate order
#[derive(Debug, Clone, Serialize)]
pub struct ModelSelectionResult {
    pub order: ArimaOrder,
    pub aic: Option<f64>,
    pub aicc: Option<f64>,
    pub bic: Option<f64>,
    /// Whether the candidate fitted
    pub success: bool,
    /// Fit failure, if any
    pub error: Option<String>,
}

impl ModelSelectionResult {
    fn criterion_value(&self, criterion: ModelSelectionCriterion) -> f64 {
        let value = match criterion {
            ModelSelectionCriterion::AIC => self.aic,
            ModelSelectionCriterion::AICc => self.aicc,
            ModelSelectionCriterion::BIC => self.bic,
        };
        value.unwrap_or(f64::INFINITY)
    }
}

/// Order search over p and q at a fixed differencing order
#[derive(Debug, Clone)]
pub struct AutoArima {
    /// Maximum AR order to consider
    max_p: usize,
    /// Differencing order
    d: usize,
    /// Maximum MA order to consider
    max_q: usize,
    criterion: ModelSelectionCriterion,
    max_iterations: usize,
    best_model: Option<ArimaForecaster>,
    selection_results: Vec<ModelSelectionResult>,
}

impl AutoArima {
    pub fn new() -> Self {
        AutoArima {
            max_p: 3,
            d: 1,
            max_q: 3,
            criterion: ModelSelectionCriterion::default(),
            max_iterations: NelderMeadOptions::default().max_iterations,
            best_model: None,
            selection_results: Vec::new(),
        }
    }

    /// Set maximum AR order
    pub fn max_p(mut self, p: usize) -> Self {
        self.max_p = p;
        self
    }

    /// Set the differencing order
    pub fn d(mut self, d: usize) -> Self {
        self.d = d;
        self
    }

    /// Set maximum MA order
    pub fn max_q(mut self, q: usize) -> Self {
        self.max_q = q;
        self
    }

    /// Set model selection criterion
    pub fn criterion(mut self, criterion: ModelSelectionCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the optimiser budget for each candidate
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn best_model(&self) -> Option<&ArimaForecaster> {
        self.best_model.as_ref()
    }

    pub fn selection_results(&self) -> &[ModelSelectionResult] {
        &self.selection_results
    }

    /// Text summary of the search
    pub fn summary(&self) -> String {
        let mut summary = String::from("Auto ARIMA model selection\n");
        summary.push_str(&format!("Criterion: {:?}\n", self.criterion));
        summary.push_str(&format!(
            "Candidates: {} ({} fitted)\n",
            self.selection_results.len(),
            self.selection_results.iter().filter(|r| r.success).count()
        ));

        match &self.best_model {
            Some(model) => {
                summary.push_str(&format!("Best Model: ARIMA{}\n", model.order()));
                if let Some(aic) = model.aic() {
                    summary.push_str(&format!("AIC: {:.4}\n", aic));
                }
                if let Some(aicc) = model.aicc() {
                    summary.push_str(&format!("AICc: {:.4}\n", aicc));
                }
                if let Some(bic) = model.bic() {
                    summary.push_str(&format!("BIC: {:.4}\n", bic));
                }
            }
            None => summary.push_str("Best Model: none\n"),
        }
        summary
    }
}

impl Default for AutoArima {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for AutoArima {
    fn fit(&mut self, series: &CountSeries) -> Result<()> {
        self.selection_results.clear();
        self.best_model = None;

        let mut best_value = f64::INFINITY;
        let mut last_error = None;

        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                let order = ArimaOrder::new(p, self.d, q);
                let mut model =
                    ArimaForecaster::new(order).with_max_iterations(self.max_iterations);

                match model.fit(series) {
                    Ok(()) => {
                        let result = ModelSelectionResult {
                            order,
                            aic: model.aic(),
                            aicc: model.aicc(),
                            bic: model.bic(),
                            success: true,
                            error: None,
                        };
                        let value = result.criterion_value(self.criterion);
                        if value < best_value {
                            best_value = value;
                            self.best_model = Some(model);
                        }
                        self.selection_results.push(result);
                    }
                    Err(err) => {
                        log::debug!("ARIMA{} skipped: {}", order, err);
                        self.selection_results.push(ModelSelectionResult {
                            order,
                            aic: None,
                            aicc: None,
                            bic: None,
                            success: false,
                            error: Some(err.to_string()),
                        });
                        last_error = Some(err);
                    }
                }
            }
        }

        match &self.best_model {
            Some(model) => {
                log::info!("selected ARIMA{} by {:?}", model.order(), self.criterion);
                Ok(())
            }
            None => Err(Error::ModelFit(format!(
                "no candidate order could be fitted{}",
                last_error
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            ))),
        }
    }

    fn forecast(&self, horizon: usize, confidence_level: f64) -> Result<ForecastResult> {
        let model = self
            .best_model
            .as_ref()
            .ok_or_else(|| Error::ModelFit("no model has been selected".to_string()))?;
        model.forecast(horizon, confidence_level)
    }

    fn name(&self) -> &str {
        "Auto ARIMA"
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        self.best_model
            .as_ref()
            .map(|m| m.parameters())
            .unwrap_or_default()
    }
}
