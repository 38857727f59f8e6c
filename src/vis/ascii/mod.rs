//! Terminal charts
//!
//! Plain-text line and bar charts for quick inspection of arrival series,
//! the fitted Poisson distribution and forecasts.

mod charts;

pub use charts::{BarChart, BarChartConfig, LinePlot, LinePlotConfig, PlotSeries};

/// Chart rendering trait
pub trait Chart {
    /// Render the chart to a string
    fn render(&self) -> String;

    /// Render to stdout
    fn display(&self) {
        println!("{}", self.render());
    }
}

/// Common chart configuration
#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Chart width in characters
    pub width: usize,
    /// Chart height in characters
    pub height: usize,
    /// Show axis labels
    pub show_labels: bool,
    /// Title for the chart
    pub title: Option<String>,
    /// X-axis label
    pub x_label: Option<String>,
    /// Y-axis label
    pub y_label: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 60,
            height: 20,
            show_labels: true,
            title: None,
            x_label: None,
            y_label: None,
        }
    }
}

impl ChartConfig {
    /// Titled config with both axis labels
    pub fn titled(title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            x_label: Some(x_label.to_string()),
            y_label: Some(y_label.to_string()),
            ..Default::default()
        }
    }
}

/// Chart style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartStyle {
    /// Simple ASCII characters
    Ascii,
    /// Unicode block characters
    #[default]
    Unicode,
}
