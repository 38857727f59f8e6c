//! Chart implementations for text-based visualization

use super::{Chart, ChartConfig, ChartStyle};

/// Width of the y-axis gutter: 8-char value plus " │"
const GUTTER: usize = 10;

// ============================================================================
// Bar Chart
// ============================================================================

/// Configuration for bar chart
#[derive(Debug, Clone)]
pub struct BarChartConfig {
    /// Base chart config
    pub base: ChartConfig,
    /// Chart style
    pub style: ChartStyle,
    /// Show values after bars
    pub show_values: bool,
    /// Decimal places of displayed values
    pub precision: usize,
    /// Max label width
    pub label_width: usize,
}

impl Default for BarChartConfig {
    fn default() -> Self {
        Self {
            base: ChartConfig::default(),
            style: ChartStyle::Unicode,
            show_values: true,
            precision: 2,
            label_width: 8,
        }
    }
}

/// Horizontal bar chart, one labelled bar per value
#[derive(Debug, Clone)]
pub struct BarChart {
    labels: Vec<String>,
    values: Vec<f64>,
    config: BarChartConfig,
}

impl BarChart {
    /// Create a new bar chart
    pub fn new<S: AsRef<str>>(labels: &[S], values: &[f64]) -> Self {
        Self::with_config(labels, values, BarChartConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config<S: AsRef<str>>(labels: &[S], values: &[f64], config: BarChartConfig) -> Self {
        Self {
            labels: labels.iter().map(|s| s.as_ref().to_string()).collect(),
            values: values.to_vec(),
            config,
        }
    }

    fn bar_char(&self) -> char {
        match self.config.style {
            ChartStyle::Ascii => '#',
            ChartStyle::Unicode => '█',
        }
    }
}

impl Chart for BarChart {
    fn render(&self) -> String {
        if self.values.is_empty() {
            return String::from("No data to display");
        }

        let mut output = String::new();
        let base = &self.config.base;
        let max_val = self.values.iter().cloned().fold(0.0, f64::max);
        let bar_width = base.width.saturating_sub(self.config.label_width + 12).max(1);
        let bar_char = self.bar_char();

        if let Some(ref title) = base.title {
            output.push_str(&format!("{:^width$}\n\n", title, width = base.width));
        }
        if let Some(ref y_label) = base.y_label {
            output.push_str(&format!("{:>width$}   {}\n", "", y_label, width = self.config.label_width));
        }

        for (label, &value) in self.labels.iter().zip(self.values.iter()) {
            let bar_len = if max_val > 0.0 && value.is_finite() {
                (value.max(0.0) / max_val * bar_width as f64).round() as usize
            } else {
                0
            };
            let bar: String = std::iter::repeat(bar_char).take(bar_len).collect();
            let label: String = label.chars().take(self.config.label_width).collect();

            output.push_str(&format!(
                "{:>lw$} │{:<bw$}",
                label,
                bar,
                lw = self.config.label_width,
                bw = bar_width
            ));
            if self.config.show_values {
                output.push_str(&format!(" {:.prec$}", value, prec = self.config.precision));
            }
            output.push('\n');
        }

        if let (true, Some(x_label)) = (base.show_labels, base.x_label.as_ref()) {
            output.push_str(&format!("{:>width$}\n", x_label, width = self.config.label_width));
        }

        output
    }
}

// ============================================================================
// Line Plot
// ============================================================================

/// Configuration for line plot
#[derive(Debug, Clone)]
pub struct LinePlotConfig {
    /// Base chart config
    pub base: ChartConfig,
    /// Chart style
    pub style: ChartStyle,
    /// Marker of the first series
    pub point_char: char,
}

impl Default for LinePlotConfig {
    fn default() -> Self {
        Self {
            base: ChartConfig {
                height: 12,
                ..Default::default()
            },
            style: ChartStyle::Unicode,
            point_char: '●',
        }
    }
}

/// One sequence of a `LinePlot`
#[derive(Debug, Clone)]
pub struct PlotSeries {
    /// Legend text
    pub label: String,
    pub values: Vec<f64>,
    /// Position of the first value on the shared x axis
    pub offset: usize,
    pub marker: char,
}

impl PlotSeries {
    pub fn new(label: impl Into<String>, values: &[f64], offset: usize, marker: char) -> Self {
        PlotSeries {
            label: label.into(),
            values: values.to_vec(),
            offset,
            marker,
        }
    }

    fn end(&self) -> usize {
        self.offset + self.values.len()
    }
}

/// Marker plot of one or more sequences over a shared index axis
#[derive(Debug, Clone)]
pub struct LinePlot {
    series: Vec<PlotSeries>,
    /// Labels under the first and last x positions
    x_range: Option<(String, String)>,
    config: LinePlotConfig,
}

impl LinePlot {
    /// Create a new line plot
    pub fn new(values: &[f64]) -> Self {
        Self::with_config(values, LinePlotConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(values: &[f64], config: LinePlotConfig) -> Self {
        let first = PlotSeries::new("", values, 0, config.point_char);
        Self {
            series: vec![first],
            x_range: None,
            config,
        }
    }

    /// Overlay another sequence; later series draw over earlier ones
    pub fn add_series(mut self, series: PlotSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Label the two ends of the x axis
    pub fn with_x_range(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.x_range = Some((first.into(), last.into()));
        self
    }

    /// Rename the first series, shown in the legend of overlaid plots
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        if let Some(first) = self.series.first_mut() {
            first.label = label.into();
        }
        self
    }

    fn x_len(&self) -> usize {
        self.series.iter().map(PlotSeries::end).max().unwrap_or(0)
    }

    fn y_bounds(&self) -> Option<(f64, f64)> {
        let finite = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite());
        finite.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    fn legend(&self) -> Option<String> {
        let labelled: Vec<String> = self
            .series
            .iter()
            .filter(|s| !s.label.is_empty())
            .map(|s| format!("{} {}", s.marker, s.label))
            .collect();
        if labelled.len() < 2 {
            return None;
        }
        Some(labelled.join("   "))
    }
}

impl Chart for LinePlot {
    fn render(&self) -> String {
        let n = self.x_len();
        let (min_val, max_val) = match self.y_bounds() {
            Some(bounds) if n > 0 => bounds,
            _ => return String::from("No data to display"),
        };

        let base = &self.config.base;
        let height = base.height.max(2);
        let width = base.width.min(n).max(1);
        let range = if (max_val - min_val).abs() < f64::EPSILON {
            1.0
        } else {
            max_val - min_val
        };

        let mut grid = vec![vec![' '; width]; height];
        for series in &self.series {
            for (i, &value) in series.values.iter().enumerate() {
                if !value.is_finite() {
                    continue;
                }
                let col = ((series.offset + i) * width / n).min(width - 1);
                let row = ((value - min_val) / range * (height - 1) as f64).round() as usize;
                grid[row.min(height - 1)][col] = series.marker;
            }
        }

        let mut output = String::new();
        if let Some(ref title) = base.title {
            output.push_str(&format!("{:^width$}\n\n", title, width = width + GUTTER));
        }
        if let Some(ref y_label) = base.y_label {
            output.push_str(y_label);
            output.push('\n');
        }

        for row in (0..height).rev() {
            if base.show_labels {
                let y_val = min_val + (row as f64 / (height - 1) as f64) * range;
                output.push_str(&format!("{:>8.1} │", y_val));
            }
            let line: String = grid[row].iter().collect();
            output.push_str(line.trim_end());
            output.push('\n');
        }

        if base.show_labels {
            output.push_str(&format!("{:>9}└{}\n", "", "─".repeat(width)));
            if let Some((first, last)) = &self.x_range {
                let pad = (width + 1).saturating_sub(first.chars().count());
                output.push_str(&format!("{:>9}{}{:>pad$}\n", "", first, last, pad = pad));
            }
            if let Some(ref x_label) = base.x_label {
                output.push_str(&format!(
                    "{:>9}{:^width$}\n",
                    "",
                    x_label,
                    width = width + 1
                ));
            }
        }

        if let Some(legend) = self.legend() {
            output.push_str(&format!("{:>9} {}\n", "", legend));
        }

        output
    }
}
