//! Wiring of the ingestion pipeline from configuration.

use crate::auth::JwtAuthenticator;
use crate::services::IngestionOrchestrator;
use crate::state::AppState;
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::PgVideoRepository;
use tubely_processing::{FfmpegRemuxer, FfprobeProber};
use tubely_storage::Storage;

pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let ingest_config = config.ingest();

    let prober = FfprobeProber::new(
        ingest_config.ffprobe_path.clone(),
        ingest_config.probe_timeout,
    )?;
    let remuxer = FfmpegRemuxer::new(
        ingest_config.ffmpeg_path.clone(),
        ingest_config.remux_timeout,
    )?;

    let orchestrator = IngestionOrchestrator::new(
        Arc::new(JwtAuthenticator::new(config.jwt_secret())),
        Arc::new(PgVideoRepository::new(pool.clone())),
        storage.clone(),
        Arc::new(prober),
        Arc::new(remuxer),
        ingest_config,
    );

    tracing::info!(
        staging_dir = %ingest_config.staging_dir().display(),
        max_video_mb = ingest_config.max_video_size_bytes / 1024 / 1024,
        max_thumbnail_mb = ingest_config.max_thumbnail_size_bytes / 1024 / 1024,
        ffmpeg_path = %ingest_config.ffmpeg_path,
        ffprobe_path = %ingest_config.ffprobe_path,
        "Ingestion pipeline initialized"
    );

    Ok(AppState::new(
        config.clone(),
        orchestrator,
        storage,
        Some(pool),
    ))
}
