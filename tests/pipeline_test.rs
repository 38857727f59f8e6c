mod common;

use chrono::Duration;
use common::{at, create_test_csv, rush_hour_detections};
use vehicle_arrivals::pipeline::{self, render_summary};
use vehicle_arrivals::{Error, PipelineConfig};

fn config_for(path: &std::path::Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input.path = path.to_path_buf();
    config
}

#[test]
fn test_three_detections_end_to_end() {
    let file = create_test_csv("three", &[at(0, 15), at(0, 45), at(1, 10)]);
    let analysis = pipeline::run(&config_for(file.path())).unwrap();
    let report = &analysis.report;

    assert_eq!(report.records, 3);
    assert_eq!(report.series.len(), 2);
    assert_eq!((report.peak.time, report.peak.count), (at(0, 0), 2));
    assert!((report.poisson.lambda - 1.5).abs() < 1e-12);

    let summary = render_summary(&analysis, 5);
    assert!(summary.contains("The peak arrival hour is 2023-01-01 00:00:00 with 2 vehicles."));
}

#[test]
fn test_single_detection() {
    let file = create_test_csv("single", &[at(8, 30)]);
    let analysis = pipeline::run(&config_for(file.path())).unwrap();
    let report = &analysis.report;

    assert_eq!(report.series.len(), 1);
    assert_eq!((report.peak.time, report.peak.count), (at(8, 0), 1));
    assert_eq!(report.poisson.pmf.len(), 2);
    assert!(report.forecast.is_none());
    assert!(report.forecast_error.as_ref().unwrap().contains("too short"));
}

#[test]
fn test_three_days_of_traffic() {
    let file = create_test_csv("three_days", &rush_hour_detections(72));
    let analysis = pipeline::run(&config_for(file.path())).unwrap();
    let report = &analysis.report;

    assert_eq!(report.series.len(), 72);
    assert_eq!(report.counted_records, report.records);
    assert!(report.summary.mean > 2.0);

    let peak_hour = chrono::Timelike::hour(&report.peak.time);
    assert!((7..=9).contains(&peak_hour) || (16..=18).contains(&peak_hour));

    let forecast = report.forecast.as_ref().unwrap();
    assert_eq!(forecast.len(), 24);
    let last = analysis.series.last_timestamp().unwrap();
    for (i, point) in forecast.points.iter().enumerate() {
        assert_eq!(point.time, last + Duration::hours(i as i64 + 1));
        assert!(point.lower <= point.value && point.value <= point.upper);
    }
}

#[test]
fn test_custom_horizon_and_order() {
    let file = create_test_csv("custom_order", &rush_hour_detections(48));
    let mut config = config_for(file.path());
    config.forecast.horizon = 6;
    config.forecast.order = "2,0,1".parse().unwrap();

    let analysis = pipeline::run(&config).unwrap();
    let forecast = analysis.report.forecast.as_ref().unwrap();
    assert_eq!(forecast.len(), 6);
    assert_eq!(forecast.method, "ARIMA(2,0,1)");
    assert!(forecast.parameters.contains_key("intercept"));
}

#[test]
fn test_output_files() {
    let file = create_test_csv("outputs", &rush_hour_detections(36));
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(file.path());

    let analysis = pipeline::run(&config).unwrap();
    let written = pipeline::write_outputs(&analysis, dir.path(), &config).unwrap();

    for name in ["hourly_counts.csv", "forecast.csv", "report.json"] {
        assert!(dir.path().join(name).exists(), "{} missing", name);
    }
    assert!(written.len() >= 3);

    let counts = std::fs::read_to_string(dir.path().join("hourly_counts.csv")).unwrap();
    assert!(counts.starts_with("Time,Arrival_Count\n"));
    assert_eq!(counts.lines().count(), 37);

    let forecast = std::fs::read_to_string(dir.path().join("forecast.csv")).unwrap();
    assert!(forecast.starts_with("Time,Forecast,Lower,Upper\n"));
    assert_eq!(forecast.lines().count(), 25);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["records"], analysis.report.records);
    assert!(report["forecast_error"].is_null());
}

#[test]
fn test_missing_input_file() {
    let config = config_for(std::path::Path::new("/nonexistent/detections.csv"));
    assert!(matches!(pipeline::run(&config), Err(Error::DataLoad(_))));
}

#[test]
fn test_invalid_config_is_rejected_before_loading() {
    let file = create_test_csv("bad_config", &[at(0, 0)]);
    let mut config = config_for(file.path());
    config.forecast.horizon = 0;
    assert!(matches!(pipeline::run(&config), Err(Error::Config(_))));
}
