//! Fakes shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::error::{AppError, Result};
use crate::models::Row;
use crate::services::SheetSource;
use crate::utils::FixedClock;

/// In-memory upstream with per-range rows and failures.
#[derive(Default)]
pub struct FakeSource {
    rows: HashMap<String, Vec<Row>>,
    failing: HashSet<String>,
    error: Option<fn() -> AppError>,
    fail_first: usize,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, range: &str, rows: Vec<Row>) -> Self {
        self.rows.insert(range.to_string(), rows);
        self
    }

    pub fn failing(mut self, range: &str) -> Self {
        self.failing.insert(range.to_string());
        self
    }

    /// Fail the first `n` fetches, then serve rows normally.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Fail every fetch with the given error.
    pub fn with_error(mut self, error: fn() -> AppError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetSource for FakeSource {
    async fn fetch_rows(&self, _sheet_id: &str, range: &str) -> Result<Vec<Row>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(AppError::upstream("HTTP 503 Service Unavailable"));
        }
        if let Some(error) = self.error {
            return Err(error());
        }
        if self.failing.contains(range) {
            return Err(AppError::upstream(format!("HTTP 500 for range '{range}'")));
        }
        Ok(self.rows.get(range).cloned().unwrap_or_default())
    }
}

/// Clock pinned to 2024-01-02T00:05:00Z.
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 5, 0).unwrap(),
    ))
}

/// Write `project_config.json` into `tmp` and return its path.
pub fn write_config(tmp: &TempDir, body: &str) -> PathBuf {
    let path = tmp.path().join("project_config.json");
    std::fs::write(&path, body).unwrap();
    path
}
