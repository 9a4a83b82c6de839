// src/pipeline/archive.rs

//! Daily archival cycle: extract, publish live, archive, rebuild manifest.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::SnapshotDocument;
use crate::storage::SnapshotStore;
use crate::utils::Clock;

use super::extract::Extractor;

/// Outcome of one successful archival cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// UTC date the snapshot was archived under
    pub date: String,
    pub dataset_count: usize,
    pub record_count: usize,
    /// Manifest after the rebuild
    pub manifest: Vec<String>,
}

/// Owns every write to the snapshot store.
///
/// Cycles and on-demand live generation are serialized so the startup run,
/// the daily timer, and request fallbacks never overlap.
pub struct Archiver {
    extractor: Extractor,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl Archiver {
    pub fn new(extractor: Extractor, store: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            extractor,
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    /// Run the full cycle once.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let _guard = self.lock.lock().await;
        log::info!("Archival cycle starting");

        let doc = self.extractor.extract_all().await?;
        self.store.publish_live(&doc).await?;

        let date = self.store.archive(self.clock.now().date_naive(), &doc).await?;
        let manifest = self.store.rebuild_manifest().await?;

        let report = CycleReport {
            date,
            dataset_count: doc.datasets.len(),
            record_count: doc.record_count(),
            manifest,
        };
        log::info!(
            "Archived snapshot for {} ({} datasets, {} records, {} dates in manifest)",
            report.date,
            report.dataset_count,
            report.record_count,
            report.manifest.len()
        );
        Ok(report)
    }

    /// Return the live snapshot, extracting and publishing it first if none
    /// exists. Does not archive or touch the manifest.
    pub async fn ensure_live(&self) -> Result<SnapshotDocument> {
        let _guard = self.lock.lock().await;

        // A cycle may have published while we waited for the lock.
        if let Some(doc) = self.store.load_live().await? {
            return Ok(doc);
        }

        log::info!("No live snapshot; generating on demand");
        let doc = self.extractor.extract_all().await?;
        self.store.publish_live(&doc).await?;
        Ok(doc)
    }
}
