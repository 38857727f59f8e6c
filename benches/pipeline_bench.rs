//! Pipeline Benchmarks
//!
//! Hourly aggregation, Poisson fitting and ARIMA estimation on synthetic
//! detection logs of increasing size.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vehicle_arrivals::stats::poisson;
use vehicle_arrivals::{ArimaForecaster, DetectionLog, DetectionRecord, Forecaster, Resample};

fn origin() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Create a synthetic detection log spanning `hours` hours
fn create_detection_log(hours: i64, per_hour: u64) -> DetectionLog {
    // Simple LCG random generator for reproducibility
    let mut rng_state: u64 = 42;
    let mut next = || {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        rng_state >> 33
    };

    let mut records = Vec::new();
    for hour in 0..hours {
        let n = per_hour / 2 + next() % per_hour.max(1);
        for _ in 0..n {
            let offset = (next() % 3600) as i64;
            let time = origin() + Duration::hours(hour) + Duration::seconds(offset);
            records.push(DetectionRecord::new(time, format!("V{}", records.len())));
        }
    }
    DetectionLog::from_records(records)
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");

    for hours in [24i64, 168, 720] {
        let log = create_detection_log(hours, 40);
        group.bench_with_input(BenchmarkId::new("count", hours), &log, |b, log| {
            b.iter(|| Resample::hourly(black_box(log)).count().unwrap())
        });
        group.bench_with_input(BenchmarkId::new("count_filled", hours), &log, |b, log| {
            b.iter(|| Resample::hourly(black_box(log)).count_filled().unwrap())
        });
    }

    group.finish();
}

fn bench_poisson_fit(c: &mut Criterion) {
    let log = create_detection_log(720, 40);
    let series = Resample::hourly(&log).count_filled().unwrap();

    c.bench_function("poisson_fit_720h", |b| {
        b.iter(|| poisson::fit(black_box(&series)).unwrap())
    });
}

fn bench_arima(c: &mut Criterion) {
    let mut group = c.benchmark_group("arima");
    group.sample_size(20);

    for hours in [72i64, 336] {
        let log = create_detection_log(hours, 40);
        let series = Resample::hourly(&log).count_filled().unwrap();

        group.bench_with_input(BenchmarkId::new("fit_111", hours), &series, |b, series| {
            b.iter(|| {
                let mut model = ArimaForecaster::arima(1, 1, 1);
                model.fit(black_box(series)).unwrap();
                model
            })
        });

        let mut fitted = ArimaForecaster::arima(1, 1, 1);
        fitted.fit(&series).unwrap();
        group.bench_with_input(BenchmarkId::new("forecast_24", hours), &fitted, |b, model| {
            b.iter(|| model.forecast(black_box(24), 0.95).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregation, bench_poisson_fit, bench_arima);
criterion_main!(benches);
