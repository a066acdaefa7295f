//! Test helpers: build AppState and router for integration tests.
//!
//! Every app gets its own staging directory, an in-memory object store, an
//! in-memory video repository and stubbed ffprobe/ffmpeg, so no Docker or
//! external binaries are needed.

pub mod fixtures;

use axum_test::TestServer;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::sync::Arc;
use tempfile::TempDir;
use tubely_api::auth::JwtAuthenticator;
use tubely_api::setup::routes;
use tubely_api::{AppState, IngestionOrchestrator};
use tubely_core::config::ServiceConfig;
use tubely_core::{Config, IngestConfig, StorageBackend, Video};
use tubely_db::{InMemoryVideoRepository, VideoRepository};
use tubely_processing::testing::{StubProber, StubRemuxer};
use tubely_storage::S3Storage;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters";
pub const TEST_BUCKET: &str = "tubely-test";
pub const TEST_URL_BASE: &str = "https://tubely-test.s3.us-east-2.amazonaws.com";

/// Knobs for a test app.
pub struct TestOptions {
    pub max_video_size_bytes: u64,
    pub max_thumbnail_size_bytes: u64,
    pub dimensions: (u32, u32),
    pub remux_fails: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            max_video_size_bytes: 1 << 20,
            max_thumbnail_size_bytes: 64 * 1024,
            dimensions: (1920, 1080),
            remux_fails: false,
        }
    }
}

/// Test application: server plus handles on every collaborator.
pub struct TestApp {
    pub server: TestServer,
    pub videos: Arc<InMemoryVideoRepository>,
    pub store: Arc<InMemory>,
    pub auth: JwtAuthenticator,
    pub staging: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Access token for `user_id`, valid for an hour.
    pub fn token_for(&self, user_id: Uuid) -> String {
        self.auth
            .issue(user_id, chrono::Duration::hours(1))
            .expect("Failed to sign test token")
    }

    /// Insert a video record owned by `owner`.
    pub async fn create_video(&self, owner: Uuid) -> Video {
        let video = Video::new(owner, "boots", "a pair of boots");
        self.videos
            .create_video(&video)
            .await
            .expect("Failed to create test video")
    }

    pub async fn stored_video(&self, id: Uuid) -> Video {
        self.videos
            .get_video(id)
            .await
            .expect("Failed to load video")
            .expect("Video disappeared")
    }

    /// Files currently in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path())
            .expect("Failed to read staging dir")
            .count()
    }

    /// Keys of every object in the store.
    pub async fn stored_objects(&self) -> Vec<String> {
        self.store
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .expect("Failed to list objects")
    }
}

pub fn test_config(staging: &TempDir, options: &TestOptions) -> Config {
    Config(Box::new(ServiceConfig {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        http_concurrency_limit: 64,
        log_format: "pretty".to_string(),
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        db_timeout_seconds: 1,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        storage_backend: Some(StorageBackend::S3),
        s3_bucket: Some(TEST_BUCKET.to_string()),
        s3_region: Some("us-east-2".to_string()),
        s3_endpoint: None,
        s3_public_base_url: None,
        local_storage_path: None,
        local_storage_base_url: None,
        ingest: IngestConfig {
            max_video_size_bytes: options.max_video_size_bytes,
            max_thumbnail_size_bytes: options.max_thumbnail_size_bytes,
            temp_dir: Some(staging.path().to_path_buf()),
            ..IngestConfig::default()
        },
    }))
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default()).await
}

pub async fn setup_test_app_with(options: TestOptions) -> TestApp {
    let staging = tempfile::tempdir().expect("Failed to create staging dir");
    let config = test_config(&staging, &options);

    let store = Arc::new(InMemory::new());
    let storage = Arc::new(S3Storage::with_store(
        store.clone(),
        TEST_BUCKET.to_string(),
        TEST_URL_BASE.to_string(),
    ));
    let videos = Arc::new(InMemoryVideoRepository::new());
    let auth = JwtAuthenticator::new(TEST_JWT_SECRET);

    let (width, height) = options.dimensions;
    let remuxer = if options.remux_fails {
        StubRemuxer::failing()
    } else {
        StubRemuxer::new()
    };

    let orchestrator = IngestionOrchestrator::new(
        Arc::new(auth.clone()),
        videos.clone(),
        storage.clone(),
        Arc::new(StubProber::new(width, height)),
        Arc::new(remuxer),
        config.ingest(),
    );

    let state = AppState::new(config.clone(), orchestrator, storage, None);
    let router = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        videos,
        store,
        auth,
        staging,
    }
}
