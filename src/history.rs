//! Bounded storage for completed test results.
//!
//! History keeps the most recent results in insertion order, dropping
//! the oldest entry once the capacity is reached. The file-backed
//! store persists after every append so an interrupted process never
//! loses completed results.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use log::warn;

use crate::errors::SpeedTestError;
use crate::results::TestResult;

/// Maximum number of results kept by default.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default number of results returned when listing history.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Storage for completed test results.
pub trait HistoryStore: Send {
    /// Append a completed result, dropping the oldest entry when the
    /// store is at capacity.
    fn append(&mut self, result: TestResult) -> Result<(), SpeedTestError>;

    /// The most recent results, newest first, at most `limit` entries.
    fn recent(&self, limit: usize) -> Vec<TestResult>;

    /// Number of stored results.
    fn len(&self) -> usize;

    /// True when no results are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory history with a fixed capacity.
#[derive(Debug)]
pub struct InMemoryHistory {
    entries: VecDeque<TestResult>,
    capacity: usize,
}

impl InMemoryHistory {
    /// Create an empty history bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// All stored results, oldest first.
    pub fn snapshot(&self) -> Vec<TestResult> {
        self.entries.iter().cloned().collect()
    }

    fn load(results: Vec<TestResult>, capacity: usize) -> Self {
        let mut results = results;
        results.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut entries = VecDeque::from(results);
        while entries.len() > capacity {
            entries.pop_front();
        }

        Self { entries, capacity }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore for InMemoryHistory {
    fn append(&mut self, result: TestResult) -> Result<(), SpeedTestError> {
        self.entries.push_back(result);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        Ok(())
    }

    fn recent(&self, limit: usize) -> Vec<TestResult> {
        let mut results: Vec<TestResult> =
            self.entries.iter().cloned().collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results.truncate(limit);
        results
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// History persisted to a JSON file.
///
/// The file holds a JSON array of results, oldest first. A missing or
/// unreadable file starts the history empty rather than failing the
/// run.
#[derive(Debug)]
pub struct JsonFileHistory {
    path: PathBuf,
    inner: InMemoryHistory,
}

impl JsonFileHistory {
    /// Open the history file at `path`, loading any existing results.
    ///
    /// Entries beyond `capacity` are dropped oldest-first on load.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let inner = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(results) => InMemoryHistory::load(results, capacity),
                Err(error) => {
                    warn!(
                        "History file {} is not valid JSON, starting empty: {}",
                        path.display(),
                        error
                    );
                    InMemoryHistory::new(capacity)
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                InMemoryHistory::new(capacity)
            }
            Err(error) => {
                warn!(
                    "Could not read history file {}, starting empty: {}",
                    path.display(),
                    error
                );
                InMemoryHistory::new(capacity)
            }
        };

        Self { path, inner }
    }

    fn persist(&self) -> Result<(), SpeedTestError> {
        let json = serde_json::to_string_pretty(&self.inner.snapshot())
            .map_err(|e| {
                SpeedTestError::io(format!(
                    "could not serialize history: {}",
                    e
                ))
            })?;

        fs::write(&self.path, json).map_err(|e| {
            SpeedTestError::from_io("could not write history file", e)
        })
    }
}

impl HistoryStore for JsonFileHistory {
    fn append(&mut self, result: TestResult) -> Result<(), SpeedTestError> {
        self.inner.append(result)?;
        self.persist()
    }

    fn recent(&self, limit: usize) -> Vec<TestResult> {
        self.inner.recent(limit)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{NetworkInfo, ServerInfo};
    use chrono::{TimeZone, Utc};

    fn sample_result(download_mbps: f64, minute: u32) -> TestResult {
        let network = NetworkInfo::new(
            "203.0.113.7".to_string(),
            "Example ISP".to_string(),
            "Lisbon, PT".to_string(),
            "wifi".to_string(),
            false,
            None,
            38.7223,
            -9.1393,
        );
        let server = ServerInfo::new(
            "Cloudflare (Global)".to_string(),
            "speed.cloudflare.com".to_string(),
            37.7749,
            -122.4194,
        );

        let mut result = TestResult::new(
            download_mbps,
            20.0,
            15.0,
            2.0,
            12.0,
            &network,
            &server,
            false,
        );
        result.created_at =
            Utc.with_ymd_and_hms(2026, 8, 1, 10, minute, 0).unwrap();
        result
    }

    #[test]
    fn test_append_within_capacity() {
        let mut history = InMemoryHistory::new(5);
        for minute in 0..3 {
            history.append(sample_result(100.0, minute)).unwrap();
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_append_drops_oldest_at_capacity() {
        let mut history = InMemoryHistory::new(3);
        for minute in 0..5 {
            history
                .append(sample_result(100.0 + minute as f64, minute))
                .unwrap();
        }

        assert_eq!(history.len(), 3);
        let recent = history.recent(10);
        // Oldest two entries (minutes 0 and 1) were dropped.
        assert!((recent[0].download_mbps - 104.0).abs() < 0.001);
        assert!((recent[2].download_mbps - 102.0).abs() < 0.001);
    }

    #[test]
    fn test_recent_orders_newest_first() {
        let mut history = InMemoryHistory::new(10);
        history.append(sample_result(100.0, 5)).unwrap();
        history.append(sample_result(200.0, 20)).unwrap();
        history.append(sample_result(300.0, 10)).unwrap();

        let recent = history.recent(10);
        assert_eq!(recent.len(), 3);
        assert!((recent[0].download_mbps - 200.0).abs() < 0.001);
        assert!((recent[1].download_mbps - 300.0).abs() < 0.001);
        assert!((recent[2].download_mbps - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_recent_respects_limit() {
        let mut history = InMemoryHistory::new(10);
        for minute in 0..5 {
            history.append(sample_result(100.0, minute)).unwrap();
        }

        let recent = history.recent(3);
        assert_eq!(recent.len(), 3);
        // Limit keeps the newest three of the five appended.
        assert_eq!(
            recent[0].created_at,
            Utc.with_ymd_and_hms(2026, 8, 1, 10, 4, 0).unwrap()
        );
    }

    #[test]
    fn test_file_store_starts_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let history =
            JsonFileHistory::open(dir.path().join("history.json"), 50);
        assert!(history.is_empty());
    }

    #[test]
    fn test_file_store_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        {
            let mut history = JsonFileHistory::open(&path, 50);
            history.append(sample_result(100.0, 1)).unwrap();
            history.append(sample_result(200.0, 2)).unwrap();
        }

        let reloaded = JsonFileHistory::open(&path, 50);
        assert_eq!(reloaded.len(), 2);
        let recent = reloaded.recent(10);
        assert!((recent[0].download_mbps - 200.0).abs() < 0.001);
        assert!((recent[1].download_mbps - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_file_store_trims_to_capacity_on_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        {
            let mut history = JsonFileHistory::open(&path, 50);
            for minute in 0..5 {
                history
                    .append(sample_result(100.0 + minute as f64, minute))
                    .unwrap();
            }
        }

        let reloaded = JsonFileHistory::open(&path, 3);
        assert_eq!(reloaded.len(), 3);
        let recent = reloaded.recent(10);
        assert!((recent[0].download_mbps - 104.0).abs() < 0.001);
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json at all").unwrap();

        let mut history = JsonFileHistory::open(&path, 50);
        assert!(history.is_empty());

        // Appending overwrites the corrupt contents with valid JSON.
        history.append(sample_result(100.0, 1)).unwrap();
        let reloaded = JsonFileHistory::open(&path, 50);
        assert_eq!(reloaded.len(), 1);
    }
}
