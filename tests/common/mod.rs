//! Common test utilities module
//!
//! Temporary detection logs and synthetic traffic for integration tests.

pub mod test_utils;

#[allow(unused_imports)]
pub use test_utils::{at, create_test_csv, rush_hour_detections, TempTestFile};
