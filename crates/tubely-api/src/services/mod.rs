pub mod ingest;

pub use ingest::{AuthorizedUpload, IngestionOrchestrator, UploadKind, UploadRequest};
