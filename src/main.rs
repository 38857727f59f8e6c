use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vehicle_arrivals::io::to_json_string;
use vehicle_arrivals::pipeline::{self, Analysis};
use vehicle_arrivals::{ArimaOrder, PipelineConfig, Result};

/// Hourly vehicle arrival analysis and 24-hour forecast
#[derive(Parser, Debug)]
#[command(name = "vehicle-arrivals", version, about)]
struct Cli {
    /// Detection log (CSV with a header row)
    input: Option<PathBuf>,

    /// Configuration file (.toml, .yaml or .yml)
    #[arg(short, long, env = "VEHICLE_ARRIVALS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for report, CSV and chart files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Forecast steps
    #[arg(long)]
    horizon: Option<usize>,

    /// ARIMA order as p,d,q
    #[arg(long, value_parser = parse_order)]
    order: Option<ArimaOrder>,

    /// Do not print terminal charts
    #[arg(long)]
    no_display: bool,

    /// Print the JSON report instead of the text summary
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_order(s: &str) -> std::result::Result<ArimaOrder, String> {
    s.parse::<ArimaOrder>().map_err(|e| e.to_string())
}

/// Exit status when every stage but the forecast succeeded
const EXIT_FORECAST_FAILED: u8 = 2;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vehicle_arrivals={}", level)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(input) = &cli.input {
        config.input.path = input.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.dir = Some(dir.clone());
    }
    if let Some(horizon) = cli.horizon {
        config.forecast.horizon = horizon;
    }
    if let Some(order) = cli.order {
        config.forecast.order = order;
    }
    if cli.no_display || cli.json {
        config.output.display = false;
    }

    config.validate()?;
    Ok(config)
}

fn report(analysis: &Analysis, config: &PipelineConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", to_json_string(&analysis.report)?);
    } else {
        print!(
            "{}",
            pipeline::render_summary(analysis, config.output.preview_rows)
        );
        if config.output.display {
            println!();
            print!("{}", pipeline::render_charts(analysis));
        }
    }

    if let Some(dir) = &config.output.dir {
        pipeline::write_outputs(analysis, dir, config)?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;
    let analysis = pipeline::run(&config)?;
    report(&analysis, &config, cli.json)?;
    Ok(analysis.report.forecast_error.is_none())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FORECAST_FAILED),
        Err(err) => {
            eprintln!("error: {}", err);
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
