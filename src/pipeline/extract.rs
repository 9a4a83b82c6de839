// src/pipeline/extract.rs

//! Extraction: configured ranges to one snapshot document.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::{AppError, Result};
use crate::models::{FlatRecord, ProjectConfig, SnapshotDocument, SnapshotMeta};
use crate::services::SheetSource;
use crate::utils::Clock;

use super::project::project;

/// Pulls every configured dataset from the upstream source.
pub struct Extractor {
    config_path: PathBuf,
    source: Arc<dyn SheetSource>,
    clock: Arc<dyn Clock>,
    max_concurrent: usize,
}

impl Extractor {
    pub fn new(
        config_path: impl Into<PathBuf>,
        source: Arc<dyn SheetSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            source,
            clock,
            max_concurrent: 1,
        }
    }

    /// Fetch up to `max_concurrent` datasets at once.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Build a fresh snapshot from the current configuration.
    ///
    /// Fails as a whole if any dataset fails: there is no partial snapshot.
    pub async fn extract_all(&self) -> Result<SnapshotDocument> {
        let config = ProjectConfig::load(&self.config_path)?;
        let sheet_id = config.sheet_id.as_str();

        let datasets: Vec<(String, Vec<FlatRecord>)> = stream::iter(
            config
                .datasets
                .iter()
                .map(|dataset| async move {
                    let rows = self
                        .source
                        .fetch_rows(sheet_id, &dataset.range)
                        .await
                        .map_err(|e| upstream_context(&dataset.name, e))?;
                    let records: Vec<FlatRecord> = rows
                        .iter()
                        .map(|row| project(row, &dataset.fields))
                        .collect();
                    log::debug!("Dataset '{}': {} records", dataset.name, records.len());
                    Ok::<_, AppError>((dataset.name.clone(), records))
                })
                .collect::<Vec<_>>(),
        )
        .buffered(self.max_concurrent)
        .try_collect()
        .await?;

        Ok(SnapshotDocument {
            meta: SnapshotMeta {
                project_name: config.project_name_or_default().to_string(),
                sheet_id: config.sheet_id.clone(),
                generated_at_utc: self.clock.now(),
            },
            datasets: datasets.into_iter().collect::<BTreeMap<_, _>>(),
        })
    }
}

/// Classify a fetch failure; anything but a credential problem is upstream.
fn upstream_context(dataset: &str, error: AppError) -> AppError {
    match error {
        AppError::Credential(_) => error,
        AppError::Upstream(message) => {
            AppError::upstream(format!("dataset '{dataset}': {message}"))
        }
        other => AppError::upstream(format!("dataset '{dataset}': {other}")),
    }
}
