//! Database repositories for data access layer
//!
//! `video` holds the trait and the PostgreSQL implementation, `memory` an
//! in-process implementation for tests and local runs without a database.

pub mod memory;
pub mod video;

pub use memory::InMemoryVideoRepository;
pub use video::{PgVideoRepository, VideoRepository};
