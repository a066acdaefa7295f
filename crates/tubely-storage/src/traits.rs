//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::keys::ObjectKey;
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tubely_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upload timed out: {0}")]
    Timeout(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {}", key)),
            StorageError::Timeout(message) => AppError::Timeout(message),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Where a published object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    pub key: String,
    pub url: String,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait so the
/// ingestion pipeline never couples to one of them.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload the file at `source` under `key`, tagged with `content_type`.
    ///
    /// All-or-nothing: on error no object is visible under `key` and no
    /// reference is returned. Publishing to an existing key overwrites it.
    /// Backends enforce their configured upload timeout themselves so that a
    /// timed-out transfer is cleaned up like any other failure.
    async fn publish(
        &self,
        source: &Path,
        key: &ObjectKey,
        content_type: &str,
    ) -> StorageResult<ObjectReference>;

    /// Download an object by its key
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Public URL an object is served from
    fn object_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
