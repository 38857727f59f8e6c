//! Visualization of analysis results
//!
//! Charts are consumers of the stage outputs and never feed back into the
//! analysis:
//!
//! - `ascii`: terminal charts, always available
//! - `plotters_ext`: PNG/SVG files, with the `visualization` feature

pub mod ascii;
pub mod plotters_ext;

use crate::detection::TIMESTAMP_FORMAT;
use crate::stats::PoissonFit;
use crate::temporal::CountSeries;
use crate::time_series::ForecastResult;

pub use self::ascii::{
    BarChart, BarChartConfig, Chart, ChartConfig, ChartStyle, LinePlot, LinePlotConfig,
    PlotSeries,
};
pub use self::plotters_ext::{plot_count_series, plot_forecast, plot_poisson_pmf, PlotSettings};

pub const ARRIVALS_TITLE: &str = "Hourly Vehicle Arrival Rate";
pub const POISSON_TITLE: &str = "Poisson Distribution of Arrival Rates";
pub const FORECAST_TITLE: &str = "Forecast of Vehicle Arrivals";

fn time_label(series: &CountSeries, last: bool) -> String {
    let ts = if last {
        series.last_timestamp()
    } else {
        series.first_timestamp()
    };
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Terminal chart of arrivals per bin
pub fn arrivals_plot(series: &CountSeries) -> LinePlot {
    let config = LinePlotConfig {
        base: ChartConfig {
            height: 12,
            ..ChartConfig::titled(ARRIVALS_TITLE, "Time", "Number of Arrivals")
        },
        ..Default::default()
    };
    LinePlot::with_config(&series.values(), config)
        .with_x_range(time_label(series, false), time_label(series, true))
}

/// Terminal bar chart of the fitted PMF
pub fn poisson_plot(fit: &PoissonFit) -> BarChart {
    let labels: Vec<String> = fit.support.iter().map(|k| k.to_string()).collect();
    let config = BarChartConfig {
        base: ChartConfig::titled(POISSON_TITLE, "Number of Arrivals", "Probability"),
        precision: 4,
        ..Default::default()
    };
    BarChart::with_config(&labels, &fit.pmf, config)
}

/// Terminal chart of history followed by the forecast and its bounds
pub fn forecast_plot(history: &CountSeries, forecast: &ForecastResult) -> LinePlot {
    let config = LinePlotConfig {
        base: ChartConfig {
            height: 14,
            ..ChartConfig::titled(FORECAST_TITLE, "Time", "Number of Arrivals")
        },
        ..Default::default()
    };

    let offset = history.len();
    let lower: Vec<f64> = forecast.points.iter().map(|p| p.lower).collect();
    let upper: Vec<f64> = forecast.points.iter().map(|p| p.upper).collect();
    let last = forecast
        .points
        .last()
        .map(|p| p.time.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| time_label(history, true));

    LinePlot::with_config(&history.values(), config)
        .with_label("Historical Arrivals")
        .add_series(PlotSeries::new("Interval", &lower, offset, '·'))
        .add_series(PlotSeries::new("", &upper, offset, '·'))
        .add_series(PlotSeries::new(
            "Forecast",
            &forecast.values(),
            offset,
            '○',
        ))
        .with_x_range(time_label(history, false), last)
}
