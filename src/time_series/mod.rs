//! Time series forecasting
//!
//! Forecasting of hourly arrival counts with ARIMA(p,d,q) models:
//!
//! - [`ArimaForecaster`]: a single model with a fixed order
//! - [`AutoArima`]: order search by information criterion

pub mod arima;
pub mod forecasting;
pub mod optimize;

pub use arima::{
    ArimaForecaster, ArimaOrder, AutoArima, ModelSelectionCriterion, ModelSelectionResult,
};
pub use forecasting::{ForecastMetrics, ForecastPoint, ForecastResult, Forecaster};
