//! End-to-end arrival analysis
//!
//! Runs load, aggregation, peak detection, Poisson fit and forecast in order.
//! Every stage result is collected in a serializable [`AnalysisReport`];
//! console text, charts and files are produced from it afterwards.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::detection::{DetectionLog, TIMESTAMP_FORMAT};
use crate::error::{Error, Result};
use crate::io;
use crate::stats::{self, poisson, DescriptiveStats, Peak, PoissonFit};
use crate::temporal::{CountPoint, CountSeries, Resample};
use crate::time_series::{
    ArimaForecaster, AutoArima, ForecastResult, Forecaster, ModelSelectionResult,
};
use crate::vis::{self, Chart, PlotSettings};

/// Serializable outcome of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Source file
    pub input: PathBuf,
    /// Records read, including those without a usable timestamp
    pub records: usize,
    /// Records that were counted
    pub counted_records: usize,
    /// Bin width in `Frequency` syntax
    pub frequency: String,
    /// Zero-count bins inserted between observed bins
    pub filled_bins: usize,
    pub series: Vec<CountPoint>,
    pub summary: DescriptiveStats,
    pub peak: Peak,
    pub poisson: PoissonFit,
    pub forecast: Option<ForecastResult>,
    /// Why the forecast is missing, when fitting failed
    pub forecast_error: Option<String>,
    /// Candidates tried by automatic order selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_selection: Option<Vec<ModelSelectionResult>>,
}

impl AnalysisReport {
    /// Console sentence naming the busiest bin
    pub fn peak_sentence(&self) -> String {
        format!(
            "The peak arrival hour is {} with {} vehicles.",
            self.peak.time.format(TIMESTAMP_FORMAT),
            self.peak.count
        )
    }
}

/// Stage outputs of a run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub log: DetectionLog,
    /// Series the statistics and forecast were computed on
    pub series: CountSeries,
    pub report: AnalysisReport,
}

/// Load the configured input and analyze it
pub fn run(config: &PipelineConfig) -> Result<Analysis> {
    config.validate()?;
    let log = io::read_detections(&config.input.path, &config.input)?;
    analyze(log, config)
}

/// Analyze an already loaded detection log
pub fn analyze(log: DetectionLog, config: &PipelineConfig) -> Result<Analysis> {
    let frequency = config.frequency()?;

    log::info!("aggregating {} records at frequency {}", log.len(), frequency);
    let observed = Resample::new(&log, frequency).count()?;
    let series = if config.aggregation.fill_gaps {
        observed.fill_gaps()?
    } else {
        observed.clone()
    };
    let filled_bins = series.len() - observed.len();
    if filled_bins > 0 {
        log::info!("filled {} empty bins with zero arrivals", filled_bins);
    }

    let peak = stats::peak(&series)?;
    let summary = stats::describe(series.values())?;
    let poisson = poisson::fit(&series)?;
    log::info!(
        "{} bins, peak {} at {}, lambda {:.3}",
        series.len(),
        peak.count,
        peak.time.format(TIMESTAMP_FORMAT),
        poisson.lambda
    );

    let outcome = forecast_stage(&series, config)?;

    let report = AnalysisReport {
        input: config.input.path.clone(),
        records: log.len(),
        counted_records: series.total() as usize,
        frequency: series.frequency().to_string(),
        filled_bins,
        series: series.points(),
        summary,
        peak,
        poisson,
        forecast: outcome.forecast,
        forecast_error: outcome.error,
        model_selection: outcome.model_selection,
    };

    Ok(Analysis {
        log,
        series,
        report,
    })
}

struct ForecastOutcome {
    forecast: Option<ForecastResult>,
    error: Option<String>,
    model_selection: Option<Vec<ModelSelectionResult>>,
}

/// Fit and forecast; a model fit failure is recorded rather than returned
fn forecast_stage(series: &CountSeries, config: &PipelineConfig) -> Result<ForecastOutcome> {
    let settings = &config.forecast;
    let mut outcome = ForecastOutcome {
        forecast: None,
        error: None,
        model_selection: None,
    };
    if !settings.enabled {
        return Ok(outcome);
    }

    let fitted = if settings.auto_order {
        let mut auto = AutoArima::new()
            .max_p(settings.max_p)
            .d(settings.order.d)
            .max_q(settings.max_q)
            .criterion(settings.criterion)
            .max_iterations(settings.max_iterations);
        let fit = auto.fit(series);
        outcome.model_selection = Some(auto.selection_results().to_vec());
        fit.and_then(|_| auto.forecast(settings.horizon, settings.confidence_level))
    } else {
        let mut model =
            ArimaForecaster::new(settings.order).with_max_iterations(settings.max_iterations);
        model
            .fit(series)
            .and_then(|_| model.forecast(settings.horizon, settings.confidence_level))
    };

    match fitted {
        Ok(forecast) => {
            log::info!("{} forecast for {} steps", forecast.method, forecast.len());
            outcome.forecast = Some(forecast);
        }
        Err(Error::ModelFit(msg)) => {
            log::warn!("forecast skipped: {}", msg);
            outcome.error = Some(msg);
        }
        Err(other) => return Err(other),
    }
    Ok(outcome)
}

/// Raw and aggregated previews followed by the peak sentence
pub fn render_summary(analysis: &Analysis, rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&analysis.log.head(rows));
    out.push('\n');
    out.push_str(&analysis.series.head(rows));
    out.push('\n');
    out.push_str(&analysis.report.peak_sentence());
    out.push('\n');
    if let Some(msg) = &analysis.report.forecast_error {
        out.push_str(&format!("Forecast unavailable: {}\n", msg));
    }
    out
}

/// Terminal charts for every available stage output
pub fn render_charts(analysis: &Analysis) -> String {
    let mut out = vis::arrivals_plot(&analysis.series).render();
    out.push('\n');
    out.push_str(&vis::poisson_plot(&analysis.report.poisson).render());
    if let Some(forecast) = &analysis.report.forecast {
        out.push('\n');
        out.push_str(&vis::forecast_plot(&analysis.series, forecast).render());
    }
    out
}

/// Write report, CSV files and (when built with charts) chart files into `dir`
pub fn write_outputs(analysis: &Analysis, dir: &Path, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let counts_path = dir.join("hourly_counts.csv");
    io::write_count_series_csv(&analysis.series, &counts_path)?;
    written.push(counts_path);

    if let Some(forecast) = &analysis.report.forecast {
        let forecast_path = dir.join("forecast.csv");
        io::write_forecast_csv(forecast, &forecast_path)?;
        written.push(forecast_path);
    }

    let report_path = dir.join("report.json");
    io::write_json(&analysis.report, &report_path)?;
    written.push(report_path);

    if cfg!(feature = "visualization") {
        written.extend(write_charts(analysis, dir, config)?);
    } else {
        log::debug!("chart files skipped: built without the `visualization` feature");
    }

    log::info!("wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

fn write_charts(analysis: &Analysis, dir: &Path, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let output = &config.output;
    let ext = output.chart_format.extension();
    let mut written = Vec::new();

    let path = dir.join(format!("hourly_arrivals.{}", ext));
    let settings = PlotSettings::for_output(output, vis::ARRIVALS_TITLE, "Time", "Number of Arrivals");
    vis::plot_count_series(&analysis.series, &path, &settings)?;
    written.push(path);

    let path = dir.join(format!("poisson_distribution.{}", ext));
    let settings =
        PlotSettings::for_output(output, vis::POISSON_TITLE, "Number of Arrivals", "Probability");
    vis::plot_poisson_pmf(&analysis.report.poisson, &path, &settings)?;
    written.push(path);

    if let Some(forecast) = &analysis.report.forecast {
        let path = dir.join(format!("forecast.{}", ext));
        let settings =
            PlotSettings::for_output(output, vis::FORECAST_TITLE, "Time", "Number of Arrivals");
        vis::plot_forecast(&analysis.series, forecast, &path, &settings)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionRecord;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn log_of(times: &[NaiveDateTime]) -> DetectionLog {
        let records = times
            .iter()
            .enumerate()
            .map(|(i, &t)| DetectionRecord::new(t, format!("V{}", i)))
            .collect();
        DetectionLog::from_records(records)
    }

    fn busy_day() -> DetectionLog {
        // Between 1 and 9 detections per hour over three days
        let start = at(0, 0);
        let mut times = Vec::new();
        for h in 0..72i64 {
            let n = 1 + ((h * 7 + h / 5) % 9);
            for k in 0..n {
                times.push(start + Duration::hours(h) + Duration::minutes(k * 5));
            }
        }
        log_of(&times)
    }

    #[test]
    fn test_three_record_scenario() {
        let log = log_of(&[at(0, 15), at(0, 45), at(1, 10)]);
        let analysis = analyze(log, &PipelineConfig::default()).unwrap();

        let report = &analysis.report;
        assert_eq!(analysis.series.counts(), &[2, 1]);
        assert_eq!(report.peak.time, at(0, 0));
        assert_eq!(report.peak.count, 2);
        assert_eq!(
            report.peak_sentence(),
            "The peak arrival hour is 2023-01-01 00:00:00 with 2 vehicles."
        );
        assert_eq!(report.poisson.support, vec![0, 1, 2]);
        // Two bins cannot support ARIMA(1,1,1)
        assert!(report.forecast.is_none());
        assert!(report.forecast_error.is_some());
    }

    #[test]
    fn test_gap_filling_is_configurable() {
        let log = log_of(&[at(0, 5), at(3, 5)]);

        let filled = analyze(log.clone(), &PipelineConfig::default()).unwrap();
        assert_eq!(filled.series.counts(), &[1, 0, 0, 1]);
        assert_eq!(filled.report.filled_bins, 2);

        let mut config = PipelineConfig::default();
        config.aggregation.fill_gaps = false;
        let sparse = analyze(log, &config).unwrap();
        assert_eq!(sparse.series.counts(), &[1, 1]);
        assert_eq!(sparse.report.filled_bins, 0);
    }

    #[test]
    fn test_full_analysis_forecasts_horizon() {
        let analysis = analyze(busy_day(), &PipelineConfig::default()).unwrap();
        let report = &analysis.report;

        assert_eq!(report.series.len(), 72);
        assert_eq!(report.counted_records, report.records);
        let forecast = report.forecast.as_ref().expect("forecast");
        assert_eq!(forecast.len(), 24);
        assert_eq!(
            forecast.points[0].time,
            analysis.series.last_timestamp().unwrap() + Duration::hours(1)
        );
        assert!(report.forecast_error.is_none());
    }

    #[test]
    fn test_auto_order_records_candidates() {
        let mut config = PipelineConfig::default();
        config.forecast.auto_order = true;
        config.forecast.max_p = 1;
        config.forecast.max_q = 1;

        let analysis = analyze(busy_day(), &config).unwrap();
        let candidates = analysis.report.model_selection.as_ref().unwrap();
        assert_eq!(candidates.len(), 4);
        assert!(analysis.report.forecast.is_some());
    }

    #[test]
    fn test_forecast_can_be_disabled() {
        let mut config = PipelineConfig::default();
        config.forecast.enabled = false;
        let analysis = analyze(busy_day(), &config).unwrap();
        assert!(analysis.report.forecast.is_none());
        assert!(analysis.report.forecast_error.is_none());
    }

    #[test]
    fn test_empty_log_is_empty_series_error() {
        let result = analyze(log_of(&[]), &PipelineConfig::default());
        assert!(matches!(result, Err(Error::EmptySeries(_))));
    }

    #[test]
    fn test_render_summary_and_charts() {
        let analysis = analyze(busy_day(), &PipelineConfig::default()).unwrap();

        let summary = render_summary(&analysis, 5);
        assert!(summary.contains("Vehicle_ID"));
        assert!(summary.contains("Arrival_Count"));
        assert!(summary.ends_with("vehicles.\n"));

        let charts = render_charts(&analysis);
        assert!(charts.contains(vis::ARRIVALS_TITLE));
        assert!(charts.contains(vis::POISSON_TITLE));
        assert!(charts.contains(vis::FORECAST_TITLE));
    }

    #[test]
    fn test_report_serializes() {
        let analysis = analyze(busy_day(), &PipelineConfig::default()).unwrap();
        let json = crate::io::to_json_string(&analysis.report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["series"].as_array().unwrap().len(), 72);
        assert_eq!(value["forecast"]["points"].as_array().unwrap().len(), 24);
        assert!(value.get("model_selection").is_none());
    }
}
