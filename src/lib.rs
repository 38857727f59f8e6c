//! Hourly vehicle arrival analysis
//!
//! Loads a timestamped detection log, counts arrivals per hour, finds the
//! busiest hour, fits a Poisson model to the hourly counts and forecasts the
//! next day with an ARIMA model.
//!
//! ```no_run
//! use vehicle_arrivals::{pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let analysis = pipeline::run(&config).unwrap();
//! println!("{}", analysis.report.peak_sentence());
//! ```

#![allow(clippy::should_implement_trait)]

pub mod config;
pub mod detection;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod stats;
pub mod temporal;
pub mod time_series;
pub mod vis;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use detection::{DetectionLog, DetectionRecord};
pub use error::{Error, Result};
pub use pipeline::{Analysis, AnalysisReport};
pub use stats::{Peak, PoissonFit};
pub use temporal::{CountSeries, Frequency, Resample};
pub use time_series::{ArimaForecaster, ArimaOrder, AutoArima, ForecastResult, Forecaster};

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
