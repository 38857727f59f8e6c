//! Test utilities for detection logs on disk
//!
//! Temporary files are removed on drop unless `keep()` is called, so a failing
//! test can leave its input behind for inspection.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static TEST_FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique path in the system temp directory
pub fn test_temp_path(test_name: &str, extension: &str) -> PathBuf {
    let counter = TEST_FILE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let filename = format!(
        "vehicle_arrivals_{}_{}_{}.{}",
        test_name,
        std::process::id(),
        counter,
        extension
    );
    std::env::temp_dir().join(filename)
}

/// RAII wrapper for temporary test files with automatic cleanup
pub struct TempTestFile {
    path: PathBuf,
    keep: bool,
}

impl TempTestFile {
    pub fn new(test_name: &str, extension: &str) -> Self {
        TempTestFile {
            path: test_temp_path(test_name, extension),
            keep: false,
        }
    }

    /// Create the file with `content`
    pub fn with_content(test_name: &str, extension: &str, content: &str) -> Self {
        let temp = Self::new(test_name, extension);
        let mut file = fs::File::create(temp.path()).expect("create temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        temp
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file after drop (for debugging)
    #[allow(dead_code)]
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for TempTestFile {
    fn drop(&mut self) {
        if !self.keep && self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Write a detection log with a `Time,Vehicle_ID` header
pub fn create_test_csv(test_name: &str, times: &[NaiveDateTime]) -> TempTestFile {
    let mut content = String::from("Time,Vehicle_ID\n");
    for (i, t) in times.iter().enumerate() {
        content.push_str(&format!("{},V{:04}\n", t.format("%Y-%m-%d %H:%M:%S"), i));
    }
    TempTestFile::with_content(test_name, "csv", &content)
}

/// 2023-01-01 at `h:m`
pub fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// Detections over `hours` hours with a daily rush-hour pattern
#[allow(dead_code)]
pub fn rush_hour_detections(hours: i64) -> Vec<NaiveDateTime> {
    let start = at(0, 0);
    let mut times = Vec::new();
    for h in 0..hours {
        let hour_of_day = h % 24;
        let base = match hour_of_day {
            7..=9 | 16..=18 => 9,
            10..=15 => 5,
            _ => 2,
        };
        let n = base + (h * 5 % 3);
        for k in 0..n {
            times.push(start + Duration::hours(h) + Duration::minutes(k * 60 / n));
        }
    }
    times
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_unique() {
        let path1 = test_temp_path("test", "csv");
        let path2 = test_temp_path("test", "csv");
        assert_ne!(path1, path2, "Paths should be unique");
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let path;
        {
            let temp = TempTestFile::with_content("drop", "txt", "data");
            path = temp.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
