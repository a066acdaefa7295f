//! Application state shared by all handlers.

use crate::services::IngestionOrchestrator;
use sqlx::PgPool;
use std::sync::Arc;
use tubely_core::Config;
use tubely_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ingest: Arc<IngestionOrchestrator>,
    pub storage: Arc<dyn Storage>,
    /// `None` when the metadata store is not PostgreSQL (tests, local runs).
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        config: Config,
        ingest: IngestionOrchestrator,
        storage: Arc<dyn Storage>,
        db_pool: Option<PgPool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            ingest: Arc::new(ingest),
            storage,
            db_pool,
        })
    }
}
