//! Service layer for the publishing application.
//!
//! This module contains:
//! - Upstream spreadsheet access (`SheetSource`, `SheetsClient`)
//! - Snapshot reads for request handlers (`QueryService`)
//! - The token-hiding tile proxy (`TileProxy`)

mod query;
mod sheets;
mod tiles;

pub use query::QueryService;
pub use sheets::{Credentials, SHEETS_API_BASE, SheetSource, SheetsClient};
pub use tiles::{CACHE_TTL_SECS, TILE_API_BASE, TileCache, TileProxy, TileResponse};
