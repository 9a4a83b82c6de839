//! Storage abstractions for snapshot persistence.
//!
//! Implements the live/historical split:
//! - Live: a single snapshot file, replaced on every extraction
//! - Historical: `YYYY-MM-DD.json`, one per archived UTC date
//! - Manifest: sorted list of archived dates, rebuilt from a full rescan
//!
//! ## Directory Structure
//!
//! ```text
//! sample.json               # Live snapshot
//! history/
//! ├── manifest.json         # ["2025-01-01", "2025-01-02"]
//! ├── 2025-01-01.json
//! └── 2025-01-02.json
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::SnapshotDocument;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for snapshot storage backends.
///
/// Every write replaces its target atomically; there is no transaction
/// across the live file, history file, and manifest.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the live snapshot.
    async fn publish_live(&self, doc: &SnapshotDocument) -> Result<()>;

    /// Write `doc` as the historical snapshot for `date`, replacing any
    /// snapshot already archived for that date. Returns the date key.
    async fn archive(&self, date: NaiveDate, doc: &SnapshotDocument) -> Result<String>;

    /// Rescan the history store and overwrite the manifest.
    async fn rebuild_manifest(&self) -> Result<Vec<String>>;

    /// Load the live snapshot, if one has been published.
    async fn load_live(&self) -> Result<Option<SnapshotDocument>>;

    /// Load the historical snapshot for a validated date key.
    async fn load_historical(&self, date_key: &str) -> Result<Option<SnapshotDocument>>;

    /// Load the persisted manifest; empty if it was never built.
    async fn load_manifest(&self) -> Result<Vec<String>>;
}
