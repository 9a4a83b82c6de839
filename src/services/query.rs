// src/services/query.rs

//! Read side: live, historical, manifest, and public config.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{ProjectConfig, PublicConfig, SnapshotDocument};
use crate::pipeline::Archiver;
use crate::storage::SnapshotStore;
use crate::utils::date::is_date_key;

/// Serves stored snapshots to request handlers.
pub struct QueryService {
    store: Arc<dyn SnapshotStore>,
    archiver: Arc<Archiver>,
    config_path: PathBuf,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        archiver: Arc<Archiver>,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            archiver,
            config_path: config_path.into(),
        }
    }

    /// Latest published snapshot, generated on demand if none exists yet.
    pub async fn live(&self) -> Result<SnapshotDocument> {
        let stored = self
            .store
            .load_live()
            .await
            .map_err(|e| AppError::DataUnavailable(e.to_string()))?;
        if let Some(doc) = stored {
            return Ok(doc);
        }

        self.archiver.ensure_live().await.map_err(|e| {
            log::warn!("On-demand extraction failed: {}", e);
            AppError::DataUnavailable(e.to_string())
        })
    }

    /// Snapshot archived for `date` (`YYYY-MM-DD`).
    ///
    /// The shape check happens before any filesystem access; a well-shaped
    /// but impossible date such as `2024-13-40` is simply not found.
    pub async fn historical(&self, date: &str) -> Result<SnapshotDocument> {
        if !is_date_key(date) {
            return Err(AppError::InvalidDateFormat(date.to_string()));
        }
        self.store
            .load_historical(date)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No data for {date}")))
    }

    /// Archived dates, ascending; empty before the first archival.
    pub async fn manifest(&self) -> Result<Vec<String>> {
        self.store.load_manifest().await
    }

    /// Project name and dataset names from the current configuration.
    pub fn public_config(&self) -> Result<PublicConfig> {
        Ok(ProjectConfig::load(&self.config_path)?.public())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Extractor;
    use crate::storage::LocalStorage;
    use crate::test_support::{FakeSource, fixed_clock, write_config};
    use serde_json::json;
    use tempfile::TempDir;

    const CONFIG: &str = r#"{"project_name": "Civic Map", "sheet_id": "secret-sheet", "datasets": {
        "hospitals": {"range": "Sheet1!A2:F", "fields": {"name": 0}},
        "emergency_rooms": {"range": "ERR!A2:D", "fields": {"name": 0}}
    }}"#;

    struct Fixture {
        tmp: TempDir,
        storage: Arc<LocalStorage>,
        source: Arc<FakeSource>,
        archiver: Arc<Archiver>,
        query: QueryService,
    }

    fn fixture(source: FakeSource) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let config = write_config(&tmp, CONFIG);
        let storage = Arc::new(LocalStorage::new(
            tmp.path().join("sample.json"),
            tmp.path().join("history"),
        ));
        let source = Arc::new(source);
        let clock = fixed_clock();
        let extractor = Extractor::new(&config, source.clone(), clock.clone());
        let archiver = Arc::new(Archiver::new(extractor, storage.clone(), clock));
        let query = QueryService::new(storage.clone(), archiver.clone(), config);
        Fixture {
            tmp,
            storage,
            source,
            archiver,
            query,
        }
    }

    fn healthy_source() -> FakeSource {
        FakeSource::new()
            .with_rows("Sheet1!A2:F", vec![vec![json!("A")]])
            .with_rows("ERR!A2:D", vec![vec![json!("E")]])
    }

    #[tokio::test]
    async fn test_live_falls_back_to_extraction_once() {
        let fx = fixture(healthy_source());

        let first = fx.query.live().await.unwrap();
        let calls_after_first = fx.source.calls();
        let second = fx.query.live().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls_after_first, 2); // one fetch per dataset
        assert_eq!(fx.source.calls(), calls_after_first);
        assert!(fx.storage.load_live().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_live_reads_existing_without_upstream() {
        let fx = fixture(healthy_source());
        fx.archiver.run_cycle().await.unwrap();
        let calls = fx.source.calls();

        fx.query.live().await.unwrap();
        assert_eq!(fx.source.calls(), calls);
    }

    #[tokio::test]
    async fn test_live_unavailable_when_fallback_fails() {
        let fx = fixture(FakeSource::new().failing("Sheet1!A2:F"));

        let err = fx.query.live().await.unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(ref m) if m.contains("Sheet1")));
        assert!(fx.storage.load_live().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_historical_rejects_bad_shape() {
        let fx = fixture(healthy_source());
        for bad in ["", "2024-1-1", "20240101", "../sample", "2024-01-01.json"] {
            let err = fx.query.historical(bad).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidDateFormat(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_historical_impossible_date_is_not_found() {
        let fx = fixture(healthy_source());
        let err = fx.query.historical("2024-13-40").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_historical_found_after_cycle() {
        let fx = fixture(healthy_source());
        fx.archiver.run_cycle().await.unwrap();

        let doc = fx.query.historical("2024-01-02").await.unwrap();
        assert_eq!(doc.meta.sheet_id, "secret-sheet");
        assert!(matches!(
            fx.query.historical("2024-01-01").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_manifest_empty_then_populated() {
        let fx = fixture(healthy_source());
        assert!(fx.query.manifest().await.unwrap().is_empty());

        fx.archiver.run_cycle().await.unwrap();
        assert_eq!(fx.query.manifest().await.unwrap(), vec!["2024-01-02"]);
    }

    #[test]
    fn test_public_config_reloads() {
        let fx = fixture(healthy_source());
        let public = fx.query.public_config().unwrap();
        assert_eq!(public.project_name, "Civic Map");
        assert_eq!(public.datasets, vec!["hospitals", "emergency_rooms"]);

        std::fs::remove_file(fx.tmp.path().join("project_config.json")).unwrap();
        assert!(fx.query.public_config().unwrap_err().is_config());
    }
}
