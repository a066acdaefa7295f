//! Tubely Database Library
//!
//! Persistence for video records behind the `VideoRepository` trait.

pub mod db;

pub use db::{InMemoryVideoRepository, PgVideoRepository, VideoRepository};
