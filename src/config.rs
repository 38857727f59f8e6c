//! Pipeline configuration
//!
//! Every section has defaults, so an empty file (or no file at all) is a
//! valid configuration. Files are TOML or YAML, chosen by extension.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::temporal::Frequency;
use crate::time_series::{ArimaOrder, ModelSelectionCriterion};

/// Default location of the detection log
pub const DEFAULT_INPUT_PATH: &str = "data/vehicle_data.csv";

/// Complete configuration of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: LoaderConfig,
    pub aggregation: AggregationConfig,
    pub forecast: ForecastConfig,
    pub output: OutputConfig,
}

/// Where and how detections are read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub path: PathBuf,
    pub timestamp_column: String,
    /// Optional in the file
    pub vehicle_column: String,
    pub delimiter: char,
    /// Fail on the first unparseable timestamp instead of skipping the row
    pub strict_timestamps: bool,
    /// Extra `strftime` formats, tried before the built-in ones
    pub timestamp_formats: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            path: PathBuf::from(DEFAULT_INPUT_PATH),
            timestamp_column: "Time".to_string(),
            vehicle_column: "Vehicle_ID".to_string(),
            delimiter: ',',
            strict_timestamps: true,
            timestamp_formats: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Bin width in `Frequency` syntax (`H`, `D`, `15T`, `2H`, ...)
    pub frequency: String,
    /// Insert zero-count bins for periods without detections
    pub fill_gaps: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        AggregationConfig {
            frequency: "H".to_string(),
            fill_gaps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub enabled: bool,
    pub horizon: usize,
    pub order: ArimaOrder,
    /// Search p and q instead of using `order` (d is kept)
    pub auto_order: bool,
    pub max_p: usize,
    pub max_q: usize,
    pub criterion: ModelSelectionCriterion,
    pub confidence_level: f64,
    pub max_iterations: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            enabled: true,
            horizon: 24,
            order: ArimaOrder::default(),
            auto_order: false,
            max_p: 3,
            max_q: 3,
            criterion: ModelSelectionCriterion::default(),
            confidence_level: 0.95,
            max_iterations: 2000,
        }
    }
}

/// Chart file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print terminal charts
    pub display: bool,
    /// Rows shown in the raw and aggregated previews
    pub preview_rows: usize,
    /// Directory for report, CSV and chart files; `None` writes nothing
    #[serde(deserialize_with = "empty_path_as_none")]
    pub dir: Option<PathBuf>,
    pub chart_format: ChartFormat,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            display: true,
            preview_rows: 5,
            dir: None,
            chart_format: ChartFormat::Png,
            chart_width: 1000,
            chart_height: 600,
        }
    }
}

/// An empty `dir` means no output directory.
fn empty_path_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let dir = Option::<PathBuf>::deserialize(deserializer)?;
    Ok(dir.filter(|path| !path.as_os_str().is_empty()))
}

impl PipelineConfig {
    /// Load a configuration file (`.toml`, `.yaml` or `.yml`)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let config: PipelineConfig = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(Error::Config(format!(
                    "unsupported config format '{}': expected .toml, .yaml or .yml",
                    path.display()
                )))
            }
        };

        log::debug!("loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Parsed aggregation frequency
    pub fn frequency(&self) -> Result<Frequency> {
        Frequency::from_str(&self.aggregation.frequency).ok_or_else(|| {
            Error::Config(format!(
                "unknown aggregation frequency '{}'",
                self.aggregation.frequency
            ))
        })
    }

    /// Check values serde cannot rule out
    pub fn validate(&self) -> Result<()> {
        self.frequency()?;

        let forecast = &self.forecast;
        if forecast.horizon == 0 {
            return Err(Error::Config(
                "forecast.horizon must be at least 1".to_string(),
            ));
        }
        if !(forecast.confidence_level > 0.0 && forecast.confidence_level < 1.0) {
            return Err(Error::Config(format!(
                "forecast.confidence_level must be in (0, 1), got {}",
                forecast.confidence_level
            )));
        }
        if forecast.order.d > 2 {
            return Err(Error::Config(format!(
                "forecast.order.d must be 0, 1 or 2, got {}",
                forecast.order.d
            )));
        }
        if forecast.max_iterations == 0 {
            return Err(Error::Config(
                "forecast.max_iterations must be at least 1".to_string(),
            ));
        }
        if matches!(&self.output.dir, Some(dir) if dir.as_os_str().is_empty()) {
            return Err(Error::Config(
                "output.dir must not be empty; omit it to skip writing files".to_string(),
            ));
        }
        if self.output.display && self.output.preview_rows == 0 {
            return Err(Error::Config(
                "output.preview_rows must be at least 1 when display is enabled".to_string(),
            ));
        }
        if self.output.chart_width == 0 || self.output.chart_height == 0 {
            return Err(Error::Config(
                "output chart dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.input.timestamp_column, "Time");
        assert_eq!(config.forecast.horizon, 24);
        assert_eq!(config.forecast.order, ArimaOrder::new(1, 1, 1));
        assert!(config.aggregation.fill_gaps);
        assert_eq!(config.frequency().unwrap(), Frequency::Hourly);
    }

    #[test]
    fn test_load_partial_toml() {
        let file = write_config(
            ".toml",
            r#"
[input]
path = "detections.csv"
strict_timestamps = false

[forecast]
horizon = 12
order = { p = 2, d = 0, q = 1 }
criterion = "bic"

[output]
chart_format = "svg"
"#,
        );

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.input.path, PathBuf::from("detections.csv"));
        assert!(!config.input.strict_timestamps);
        assert_eq!(config.input.timestamp_column, "Time");
        assert_eq!(config.forecast.horizon, 12);
        assert_eq!(config.forecast.order, ArimaOrder::new(2, 0, 1));
        assert_eq!(config.forecast.criterion, ModelSelectionCriterion::BIC);
        assert_eq!(config.output.chart_format, ChartFormat::Svg);
        assert_eq!(config.output.preview_rows, 5);
    }

    #[test]
    fn test_load_yaml() {
        let file = write_config(
            ".yaml",
            "aggregation:\n  frequency: 30T\n  fill_gaps: false\nforecast:\n  enabled: false\n",
        );

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.frequency().unwrap(), Frequency::Custom(chrono::Duration::minutes(30)));
        assert!(!config.aggregation.fill_gaps);
        assert!(!config.forecast.enabled);
    }

    #[test]
    fn test_empty_output_dir_writes_nothing() {
        let file = write_config(".toml", "[output]\ndir = \"\"\n");
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output.dir, None);

        let file = write_config(".yaml", "output:\n  dir: \"\"\n");
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output.dir, None);

        let file = write_config(".toml", "[output]\ndir = \"reports\"\n");
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output.dir, Some(PathBuf::from("reports")));

        let mut config = PipelineConfig::default();
        config.output.dir = Some(PathBuf::new());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_oversized_frequency_is_config_error() {
        let mut config = PipelineConfig::default();
        config.aggregation.frequency = "9999999999999H".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_extension() {
        let file = write_config(".ini", "horizon = 3");
        assert!(matches!(
            PipelineConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config(".toml", "[forecast\nhorizon = ");
        assert!(matches!(
            PipelineConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validation_rules() {
        let mut config = PipelineConfig::default();
        config.forecast.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.forecast.confidence_level = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.aggregation.frequency = "fortnightly".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.forecast.order = ArimaOrder::new(1, 3, 1);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.output.preview_rows = 0;
        assert!(config.validate().is_err());
        config.output.display = false;
        assert!(config.validate().is_ok());
    }
}
