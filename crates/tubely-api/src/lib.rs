//! Tubely API Library
//!
//! HTTP surface of the ingestion service: authentication, the ingestion
//! orchestrator, handlers and application setup.

mod api_doc;
mod handlers;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use services::{AuthorizedUpload, IngestionOrchestrator, UploadKind, UploadRequest};
pub use state::AppState;
