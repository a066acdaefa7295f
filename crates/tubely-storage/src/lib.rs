//! Tubely Storage Library
//!
//! Durable object storage for published media. The `Storage` trait takes a
//! finished local file and makes it available under an object key.
//!
//! # Object key format
//!
//! - **Videos**: `{orientation}/{random}.{ext}` where orientation is
//!   `landscape`, `portrait` or `other`
//! - **Thumbnails**: `thumbnails/{random}.{ext}`
//!
//! `{random}` is 32 bytes from the OS-seeded CSPRNG, base64url without
//! padding. `{ext}` is the media subtype (`mp4`, `png`...). Key generation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::ObjectKey;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectReference, Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
