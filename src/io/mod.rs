pub mod csv;
pub mod json;

// Re-export commonly used functions
pub use csv::{parse_timestamp, read_detections, write_count_series_csv, write_forecast_csv};
pub use json::{to_json_string, write_json};
