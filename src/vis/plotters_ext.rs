//! Chart files (PNG/SVG) rendered with plotters
//!
//! Available with the `visualization` feature. Without it the plotting
//! functions return `Error::Visualization`, so callers can treat chart export
//! as optional.

use std::path::Path;

use crate::config::{ChartFormat, OutputConfig};
use crate::error::Result;
use crate::stats::PoissonFit;
use crate::temporal::CountSeries;
use crate::time_series::ForecastResult;

/// Chart settings
#[derive(Debug, Clone)]
pub struct PlotSettings {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub format: ChartFormat,
    pub show_legend: bool,
    pub show_grid: bool,
    /// Series colours in drawing order
    pub color_palette: Vec<(u8, u8, u8)>,
}

impl Default for PlotSettings {
    fn default() -> Self {
        PlotSettings {
            title: "Plot".to_string(),
            x_label: "X".to_string(),
            y_label: "Y".to_string(),
            width: 1000,
            height: 600,
            format: ChartFormat::Png,
            show_legend: true,
            show_grid: true,
            color_palette: vec![
                (0, 123, 255),  // blue
                (255, 99, 71),  // red
                (46, 204, 113), // green
                (255, 193, 7),  // yellow
            ],
        }
    }
}

impl PlotSettings {
    /// Settings sized and formatted from the output configuration
    pub fn for_output(output: &OutputConfig, title: &str, x_label: &str, y_label: &str) -> Self {
        PlotSettings {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            width: output.chart_width,
            height: output.chart_height,
            format: output.chart_format,
            ..PlotSettings::default()
        }
    }

    #[cfg(feature = "visualization")]
    fn color(&self, idx: usize) -> (u8, u8, u8) {
        if self.color_palette.is_empty() {
            return (0, 0, 0);
        }
        self.color_palette[idx % self.color_palette.len()]
    }
}

#[cfg(feature = "visualization")]
mod render {
    use super::*;
    use chrono::{Duration, NaiveDateTime};
    use plotters::coord::Shift;
    use plotters::prelude::*;

    use crate::detection::TIMESTAMP_FORMAT;
    use crate::error::Error;

    const AXIS_TIME_FORMAT: &str = "%m-%d %H:%M";

    /// Position of `time` in bins after `origin`
    fn bin_offset(origin: NaiveDateTime, time: NaiveDateTime, step_secs: f64) -> f64 {
        (time - origin).num_seconds() as f64 / step_secs
    }

    fn step_seconds(series: &CountSeries) -> f64 {
        series.frequency().to_seconds().max(1) as f64
    }

    fn padded(min: f64, max: f64) -> (f64, f64) {
        let margin = ((max - min) * 0.05).max(0.5);
        (min - margin, max + margin)
    }

    pub(super) fn count_series<DB>(
        root: DrawingArea<DB, Shift>,
        series: &CountSeries,
        settings: &PlotSettings,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let origin = series
            .first_timestamp()
            .ok_or_else(|| Error::Visualization("no arrivals to plot".to_string()))?;
        let step = step_seconds(series);
        let points: Vec<(f64, f64)> = series
            .iter()
            .map(|p| (bin_offset(origin, p.time, step), p.count as f64))
            .collect();

        let x_max = points.last().map(|p| p.0).unwrap_or(0.0);
        let y_max = series.counts().iter().copied().max().unwrap_or(0) as f64;
        let (x_lo, x_hi) = padded(0.0, x_max);

        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(&settings.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_lo..x_hi, 0.0..(y_max * 1.1).max(1.0))?;

        let time_label = |v: &f64| {
            (origin + Duration::seconds((v * step).round() as i64))
                .format(AXIS_TIME_FORMAT)
                .to_string()
        };
        let mut mesh = chart.configure_mesh();
        if !settings.show_grid {
            mesh.disable_mesh();
        }
        mesh.x_labels(8)
            .x_label_formatter(&time_label)
            .y_label_formatter(&|v| format!("{:.0}", v))
            .x_desc(&settings.x_label)
            .y_desc(&settings.y_label)
            .draw()?;

        let rgb = settings.color(0);
        let color = RGBColor(rgb.0, rgb.1, rgb.2);
        chart
            .draw_series(LineSeries::new(points.clone(), color))?
            .label(series.name().to_owned())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;

        if settings.show_legend {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }

    pub(super) fn poisson_pmf<DB>(
        root: DrawingArea<DB, Shift>,
        fit: &PoissonFit,
        settings: &PlotSettings,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let max_k = fit.max_count() as f64;
        let max_p = fit.pmf.iter().cloned().fold(0.0, f64::max);

        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(&settings.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..(max_k + 0.5), 0.0..(max_p * 1.1).max(0.01))?;

        let mut mesh = chart.configure_mesh();
        if !settings.show_grid {
            mesh.disable_mesh();
        }
        mesh.x_label_formatter(&|v| format!("{:.0}", v))
            .y_label_formatter(&|v| format!("{:.3}", v))
            .x_desc(&settings.x_label)
            .y_desc(&settings.y_label)
            .draw()?;

        let rgb = settings.color(0);
        let color = RGBColor(rgb.0, rgb.1, rgb.2);
        chart
            .draw_series(fit.support.iter().zip(fit.pmf.iter()).map(|(&k, &p)| {
                let x = k as f64;
                Rectangle::new([(x - 0.4, 0.0), (x + 0.4, p)], color.filled())
            }))?
            .label(format!("Poisson(λ = {:.2})", fit.lambda))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));

        if settings.show_legend {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }

    pub(super) fn forecast<DB>(
        root: DrawingArea<DB, Shift>,
        history: &CountSeries,
        forecast: &ForecastResult,
        settings: &PlotSettings,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let origin = history
            .first_timestamp()
            .or_else(|| forecast.points.first().map(|p| p.time))
            .ok_or_else(|| Error::Visualization("nothing to plot".to_string()))?;
        let step = step_seconds(history);

        let observed: Vec<(f64, f64)> = history
            .iter()
            .map(|p| (bin_offset(origin, p.time, step), p.count as f64))
            .collect();
        let predicted: Vec<(f64, f64)> = forecast
            .points
            .iter()
            .map(|p| (bin_offset(origin, p.time, step), p.value))
            .collect();

        let mut band: Vec<(f64, f64)> = forecast
            .points
            .iter()
            .map(|p| (bin_offset(origin, p.time, step), p.upper))
            .collect();
        band.extend(
            forecast
                .points
                .iter()
                .rev()
                .map(|p| (bin_offset(origin, p.time, step), p.lower)),
        );

        let x_max = predicted
            .last()
            .or_else(|| observed.last())
            .map(|p| p.0)
            .unwrap_or(0.0);
        let ys = observed.iter().chain(band.iter()).map(|p| p.1);
        let y_min = ys.clone().fold(f64::INFINITY, f64::min).min(0.0);
        let y_max = ys.fold(f64::NEG_INFINITY, f64::max).max(1.0);
        let (x_lo, x_hi) = padded(0.0, x_max);
        let (y_lo, y_hi) = padded(y_min, y_max);

        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(&settings.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

        let time_label = |v: &f64| {
            (origin + Duration::seconds((v * step).round() as i64))
                .format(AXIS_TIME_FORMAT)
                .to_string()
        };
        let mut mesh = chart.configure_mesh();
        if !settings.show_grid {
            mesh.disable_mesh();
        }
        mesh.x_labels(8)
            .x_label_formatter(&time_label)
            .x_desc(&settings.x_label)
            .y_desc(&settings.y_label)
            .draw()?;

        let hist_rgb = settings.color(0);
        let hist_color = RGBColor(hist_rgb.0, hist_rgb.1, hist_rgb.2);
        let fc_rgb = settings.color(1);
        let fc_color = RGBColor(fc_rgb.0, fc_rgb.1, fc_rgb.2);

        if !band.is_empty() {
            chart
                .draw_series(std::iter::once(Polygon::new(band, fc_color.mix(0.2).filled())))?
                .label(format!(
                    "{:.0}% interval",
                    forecast.confidence_level * 100.0
                ))
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 20, y + 5)], fc_color.mix(0.2).filled())
                });
        }

        chart
            .draw_series(LineSeries::new(observed, hist_color))?
            .label("Historical Arrivals")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], hist_color));

        chart
            .draw_series(LineSeries::new(predicted, fc_color))?
            .label("Forecast")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], fc_color));

        if settings.show_legend {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .position(SeriesLabelPosition::UpperLeft)
                .draw()?;
        }

        root.present()?;
        log::trace!(
            "forecast chart spans {} to {}",
            origin.format(TIMESTAMP_FORMAT),
            forecast
                .points
                .last()
                .map(|p| p.time.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default()
        );
        Ok(())
    }
}

#[cfg(feature = "visualization")]
macro_rules! with_backend {
    ($path:expr, $settings:expr, |$root:ident| $body:expr) => {{
        use plotters::prelude::*;
        let size = ($settings.width, $settings.height);
        match $settings.format {
            ChartFormat::Png => {
                let $root = BitMapBackend::new($path, size).into_drawing_area();
                $body
            }
            ChartFormat::Svg => {
                let $root = SVGBackend::new($path, size).into_drawing_area();
                $body
            }
        }
    }};
}

/// Line chart with markers of arrivals per bin
#[cfg(feature = "visualization")]
pub fn plot_count_series<P: AsRef<Path>>(
    series: &CountSeries,
    path: P,
    settings: &PlotSettings,
) -> Result<()> {
    let path = path.as_ref();
    with_backend!(path, settings, |root| render::count_series(root, series, settings))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Bar chart of the fitted Poisson probabilities
#[cfg(feature = "visualization")]
pub fn plot_poisson_pmf<P: AsRef<Path>>(
    fit: &PoissonFit,
    path: P,
    settings: &PlotSettings,
) -> Result<()> {
    let path = path.as_ref();
    with_backend!(path, settings, |root| render::poisson_pmf(root, fit, settings))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// History, forecast and prediction band on one time axis
#[cfg(feature = "visualization")]
pub fn plot_forecast<P: AsRef<Path>>(
    history: &CountSeries,
    forecast: &ForecastResult,
    path: P,
    settings: &PlotSettings,
) -> Result<()> {
    let path = path.as_ref();
    with_backend!(path, settings, |root| render::forecast(
        root, history, forecast, settings
    ))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

#[cfg(not(feature = "visualization"))]
fn feature_disabled() -> crate::error::Error {
    crate::error::Error::Visualization(
        "chart export requires the `visualization` feature".to_string(),
    )
}

#[cfg(not(feature = "visualization"))]
pub fn plot_count_series<P: AsRef<Path>>(
    _series: &CountSeries,
    _path: P,
    _settings: &PlotSettings,
) -> Result<()> {
    Err(feature_disabled())
}

#[cfg(not(feature = "visualization"))]
pub fn plot_poisson_pmf<P: AsRef<Path>>(
    _fit: &PoissonFit,
    _path: P,
    _settings: &PlotSettings,
) -> Result<()> {
    Err(feature_disabled())
}

#[cfg(not(feature = "visualization"))]
pub fn plot_forecast<P: AsRef<Path>>(
    _history: &CountSeries,
    _forecast: &ForecastResult,
    _path: P,
    _settings: &PlotSettings,
) -> Result<()> {
    Err(feature_disabled())
}
