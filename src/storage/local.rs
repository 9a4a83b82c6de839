//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {live_path}               # Live snapshot
//! {history_dir}/
//! ├── manifest.json         # Sorted archived dates
//! └── YYYY-MM-DD.json       # Historical snapshots
//! ```
//!
//! The manifest is an index of the directory, not a source of truth: it is
//! rebuilt from a full rescan every time, so manual deletions or stray files
//! are corrected on the next archival cycle.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::SnapshotDocument;
use crate::storage::SnapshotStore;
use crate::utils::date::{date_from_file_name, date_key, snapshot_file_name};
use crate::utils::fs::{read_json_optional, write_atomic, write_json_atomic};

const MANIFEST_FILE: &str = "manifest.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    live_path: PathBuf,
    history_dir: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage from a live file path and history directory.
    pub fn new(live_path: impl Into<PathBuf>, history_dir: impl Into<PathBuf>) -> Self {
        Self {
            live_path: live_path.into(),
            history_dir: history_dir.into(),
        }
    }

    /// Create the history directory if it does not exist yet.
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.history_dir).await?;
        Ok(())
    }

    pub fn live_path(&self) -> &Path {
        &self.live_path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.history_dir.join(MANIFEST_FILE)
    }

    fn historical_path(&self, key: &str) -> PathBuf {
        self.history_dir.join(snapshot_file_name(key))
    }

    /// Date keys of every `YYYY-MM-DD.json` in the history directory, sorted.
    async fn scan_history(&self) -> Result<Vec<String>> {
        let mut dates = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.history_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dates),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(date_from_file_name) {
                dates.push(key.to_string());
            }
        }

        // Lexicographic order is chronological for YYYY-MM-DD.
        dates.sort();
        Ok(dates)
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn publish_live(&self, doc: &SnapshotDocument) -> Result<()> {
        write_json_atomic(&self.live_path, doc).await?;
        log::info!(
            "Live snapshot published to {} ({} records)",
            self.live_path.display(),
            doc.record_count()
        );
        Ok(())
    }

    async fn archive(&self, date: NaiveDate, doc: &SnapshotDocument) -> Result<String> {
        let key = date_key(date);
        let path = self.historical_path(&key);
        let bytes = serde_json::to_vec(doc)?;
        write_atomic(&path, &bytes).await?;
        log::info!("Archived snapshot for {} to {}", key, path.display());
        Ok(key)
    }

    async fn rebuild_manifest(&self) -> Result<Vec<String>> {
        let dates = self.scan_history().await?;
        write_json_atomic(&self.manifest_path(), &dates).await?;
        log::info!("Manifest rebuilt: {} archived dates", dates.len());
        Ok(dates)
    }

    async fn load_live(&self) -> Result<Option<SnapshotDocument>> {
        read_json_optional(&self.live_path).await
    }

    async fn load_historical(&self, date_key: &str) -> Result<Option<SnapshotDocument>> {
        read_json_optional(&self.historical_path(date_key)).await
    }

    async fn load_manifest(&self) -> Result<Vec<String>> {
        match read_json_optional::<Vec<String>>(&self.manifest_path()).await {
            Ok(dates) => Ok(dates.unwrap_or_default()),
            Err(e) => {
                log::warn!("Unreadable manifest at {}: {}", self.manifest_path().display(), e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotMeta;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(tmp.path().join("sample.json"), tmp.path().join("history"))
    }

    fn sample_doc(name: &str) -> SnapshotDocument {
        let record = json!({"name": name, "gps": "1,2"}).as_object().cloned().unwrap();
        SnapshotDocument {
            meta: SnapshotMeta {
                project_name: "Test".into(),
                sheet_id: "sheet".into(),
                generated_at_utc: Utc.with_ymd_and_hms(2024, 1, 2, 0, 5, 0).unwrap(),
            },
            datasets: BTreeMap::from([("hospitals".to_string(), vec![record])]),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_publish_and_load_live() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        assert!(storage.load_live().await.unwrap().is_none());

        storage.publish_live(&sample_doc("A")).await.unwrap();
        assert_eq!(storage.load_live().await.unwrap(), Some(sample_doc("A")));

        storage.publish_live(&sample_doc("B")).await.unwrap();
        assert_eq!(storage.load_live().await.unwrap(), Some(sample_doc("B")));
    }

    #[tokio::test]
    async fn test_archive_same_day_overwrites() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        storage.archive(day(2), &sample_doc("first")).await.unwrap();
        let key = storage.archive(day(2), &sample_doc("second")).await.unwrap();
        assert_eq!(key, "2024-01-02");

        let stored = storage.load_historical("2024-01-02").await.unwrap().unwrap();
        assert_eq!(stored, sample_doc("second"));

        let manifest = storage.rebuild_manifest().await.unwrap();
        assert_eq!(manifest, vec!["2024-01-02"]);
    }

    #[tokio::test]
    async fn test_manifest_sorted_and_ignores_stray_files() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage.ensure_dirs().await.unwrap();

        let history = tmp.path().join("history");
        std::fs::write(history.join("2024-01-02.json"), "{}").unwrap();
        std::fs::write(history.join("2024-01-01.json"), "{}").unwrap();
        std::fs::write(history.join("notes.txt"), "scratch").unwrap();
        std::fs::write(history.join("2024-1-3.json"), "{}").unwrap();
        std::fs::create_dir(history.join("2024-01-09.json")).unwrap();

        let first = storage.rebuild_manifest().await.unwrap();
        assert_eq!(first, vec!["2024-01-01", "2024-01-02"]);

        // Deterministic and idempotent; the manifest file itself is excluded.
        let second = storage.rebuild_manifest().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.load_manifest().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_manifest_self_heals_after_deletion() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        storage.archive(day(1), &sample_doc("A")).await.unwrap();
        storage.archive(day(2), &sample_doc("B")).await.unwrap();
        assert_eq!(storage.rebuild_manifest().await.unwrap().len(), 2);

        std::fs::remove_file(tmp.path().join("history/2024-01-01.json")).unwrap();
        assert_eq!(storage.rebuild_manifest().await.unwrap(), vec!["2024-01-02"]);
    }

    #[tokio::test]
    async fn test_manifest_missing_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        assert!(storage.load_manifest().await.unwrap().is_empty());
        // Missing history directory rescans as empty too.
        assert!(storage.rebuild_manifest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_manifest_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        storage.ensure_dirs().await.unwrap();
        std::fs::write(storage.manifest_path(), "[\"2024-01-0").unwrap();

        assert!(storage.load_manifest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_historical_missing() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        assert!(storage.load_historical("2024-01-01").await.unwrap().is_none());
    }
}
