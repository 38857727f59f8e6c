use thiserror::Error;

/// Error type for every stage of the arrival analysis
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load detection data: {0}")]
    DataLoad(String),

    #[error("failed to aggregate arrivals: {0}")]
    Aggregation(String),

    #[error("empty series: {0}")]
    EmptySeries(String),

    #[error("model fit failed: {0}")]
    ModelFit(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("visualization error: {0}")]
    Visualization(String),

    #[error("I/O error")]
    Io(#[source] std::io::Error),

    #[error("CSV error")]
    Csv(#[source] csv::Error),

    #[error("JSON error")]
    Json(#[source] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

// Plotters drawing errors
#[cfg(feature = "visualization")]
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for Error
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Error::Visualization(format!("failed to draw chart: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_stage() {
        let err = Error::ModelFit("series too short".to_string());
        assert_eq!(err.to_string(), "model fit failed: series too short");

        let err = Error::EmptySeries("no bins".to_string());
        assert!(err.to_string().starts_with("empty series"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
