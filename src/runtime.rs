//! Service wiring.
//!
//! Builds every collaborator explicitly from [`Settings`] so the HTTP shell,
//! the scheduler, and the CLI share one set of instances, and tests can swap
//! in their own upstream source and clock.

use std::sync::Arc;

use axum::Router;

use crate::error::Result;
use crate::models::Settings;
use crate::pipeline::{Archiver, DailySchedule, Extractor};
use crate::server::{self, AppState};
use crate::services::{QueryService, SheetSource, SheetsClient, TileCache, TileProxy};
use crate::storage::LocalStorage;
use crate::utils::{Clock, SystemClock};

/// Fully wired service graph.
pub struct Runtime {
    pub settings: Settings,
    pub clock: Arc<dyn Clock>,
    pub storage: Arc<LocalStorage>,
    pub archiver: Arc<Archiver>,
    pub query: Arc<QueryService>,
    pub tiles: Arc<TileProxy>,
}

impl Runtime {
    /// Wire production collaborators: Google Sheets and the wall clock.
    pub fn build(settings: Settings) -> Result<Self> {
        let source = SheetsClient::new(&settings.upstream, settings.credentials_path.clone())?;
        Self::with_source(settings, Arc::new(source), Arc::new(SystemClock))
    }

    /// Wire with an explicit upstream source and clock.
    pub fn with_source(
        settings: Settings,
        source: Arc<dyn SheetSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let storage = Arc::new(LocalStorage::new(&settings.live_path, &settings.history_dir));

        let extractor = Extractor::new(&settings.config_path, source, clock.clone())
            .with_max_concurrent(settings.upstream.max_concurrent);
        let archiver = Arc::new(Archiver::new(extractor, storage.clone(), clock.clone()));
        let query = Arc::new(QueryService::new(
            storage.clone(),
            archiver.clone(),
            &settings.config_path,
        ));

        let cache = TileCache::new(&settings.cache_dir, clock.clone());
        let tiles = Arc::new(TileProxy::new(
            &settings.upstream,
            settings.tile_token.clone(),
            cache,
        )?);

        Ok(Self {
            settings,
            clock,
            storage,
            archiver,
            query,
            tiles,
        })
    }

    /// Create the on-disk directories the service writes to.
    pub async fn prepare(&self) -> Result<()> {
        self.storage.ensure_dirs().await?;
        tokio::fs::create_dir_all(&self.settings.cache_dir).await?;
        Ok(())
    }

    /// Archival schedule in the configured offset.
    pub fn schedule(&self) -> DailySchedule {
        DailySchedule::nightly(self.settings.timezone)
    }

    /// HTTP router over this runtime's services.
    pub fn router(&self) -> Router {
        server::router(AppState {
            query: self.query.clone(),
            tiles: self.tiles.clone(),
        })
    }
}
