//! Pipeline stages for snapshot publishing.
//!
//! - `project`: one upstream row to one flat record
//! - `extract`: all configured datasets to one snapshot document
//! - `archive`: publish live, archive by UTC date, rebuild the manifest
//! - `schedule`: startup run plus a daily trigger

pub mod archive;
pub mod extract;
pub mod project;
pub mod schedule;

pub use archive::{Archiver, CycleReport};
pub use extract::Extractor;
pub use project::project;
pub use schedule::{DailySchedule, spawn_scheduler};
