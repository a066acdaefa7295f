//! Configuration module
//!
//! All settings are read once from the environment (optionally seeded by a
//! `.env` file) and handed to constructors explicitly. Nothing else in the
//! workspace reads environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{MAX_THUMBNAIL_SIZE_BYTES, MAX_VIDEO_SIZE_BYTES, MIB};
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const HTTP_CONCURRENCY_LIMIT: usize = 256;
const MAX_VIDEO_SIZE_MB: u64 = 1024;
const MAX_THUMBNAIL_SIZE_MB: u64 = 10;
const PROBE_TIMEOUT_SECS: u64 = 30;
const REMUX_TIMEOUT_SECS: u64 = 600;
const UPLOAD_TIMEOUT_SECS: u64 = 600;

/// Settings that drive the ingestion pipeline itself.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub max_video_size_bytes: u64,
    pub max_thumbnail_size_bytes: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub probe_timeout: Duration,
    pub remux_timeout: Duration,
    pub upload_timeout: Duration,
    /// Directory holding staged files. `None` means the OS temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_video_size_bytes: MAX_VIDEO_SIZE_BYTES,
            max_thumbnail_size_bytes: MAX_THUMBNAIL_SIZE_BYTES,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            remux_timeout: Duration::from_secs(REMUX_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(UPLOAD_TIMEOUT_SECS),
            temp_dir: None,
        }
    }
}

impl IngestConfig {
    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub http_concurrency_limit: usize,
    pub log_format: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, LocalStack...)
    pub s3_endpoint: Option<String>,
    /// Public base URL (e.g. a CDN) used instead of the bucket URL
    pub s3_public_base_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub ingest: IngestConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().http_concurrency_limit
    }

    pub fn log_format(&self) -> &str {
        &self.inner().log_format
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().jwt_secret
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn s3_public_base_url(&self) -> Option<&str> {
        self.inner().s3_public_base_url.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn ingest(&self) -> &IngestConfig {
        &self.inner().ingest
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read a size in MiB from `key` and convert it to bytes.
fn env_size_mb(key: &str, default_mb: u64) -> Result<u64, anyhow::Error> {
    let mb = env_parse(key, default_mb);
    mb.checked_mul(MIB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MiB", key, mb))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(raw) => Some(raw.parse::<StorageBackend>()?),
            None => None,
        };

        let ingest = IngestConfig {
            max_video_size_bytes: env_size_mb("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB)?,
            max_thumbnail_size_bytes: env_size_mb("MAX_THUMBNAIL_SIZE_MB", MAX_THUMBNAIL_SIZE_MB)?,
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            probe_timeout: Duration::from_secs(env_parse("PROBE_TIMEOUT_SECS", PROBE_TIMEOUT_SECS)),
            remux_timeout: Duration::from_secs(env_parse("REMUX_TIMEOUT_SECS", REMUX_TIMEOUT_SECS)),
            upload_timeout: Duration::from_secs(env_parse(
                "UPLOAD_TIMEOUT_SECS",
                UPLOAD_TIMEOUT_SECS,
            )),
            temp_dir: env_opt("TEMP_DIR").map(PathBuf::from),
        };

        Ok(ServiceConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8091".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            http_concurrency_limit: env_parse("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION").or_else(|| env_opt("AWS_REGION")),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            s3_public_base_url: env_opt("S3_PUBLIC_BASE_URL"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            ingest,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.ingest.max_video_size_bytes == 0 || self.ingest.max_thumbnail_size_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limits must be greater than zero"));
        }

        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
