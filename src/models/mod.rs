// src/models/mod.rs

//! Domain models for the publishing service.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod project;
mod settings;
mod snapshot;

// Re-export all public types
pub use project::{DatasetSpec, FieldSpec, ProjectConfig, PublicConfig};
pub use settings::{Settings, UpstreamSettings, parse_timezone};
pub use snapshot::{FlatRecord, Row, SnapshotDocument, SnapshotMeta};
