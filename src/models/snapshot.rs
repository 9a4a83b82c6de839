//! Published snapshot documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream row: ordered cell values.
pub type Row = Vec<Value>;

/// One output record: configured field name to cell value or null.
pub type FlatRecord = Map<String, Value>;

/// Snapshot header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotMeta {
    /// Project display name (empty when unset)
    #[serde(default)]
    pub project_name: String,

    /// Upstream spreadsheet identifier
    pub sheet_id: String,

    /// Extraction time
    pub generated_at_utc: DateTime<Utc>,
}

/// One full extraction: metadata plus every dataset's records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotDocument {
    pub meta: SnapshotMeta,

    /// Dataset name to records, records in upstream row order
    pub datasets: BTreeMap<String, Vec<FlatRecord>>,
}

impl SnapshotDocument {
    /// Total number of records across all datasets.
    pub fn record_count(&self) -> usize {
        self.datasets.values().map(Vec::len).sum()
    }
}
