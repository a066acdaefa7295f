//! Tubely Core Library
//!
//! This crate provides the domain model, error taxonomy and configuration
//! shared by every Tubely component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, IngestConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Orientation, Video};
pub use storage_types::StorageBackend;
