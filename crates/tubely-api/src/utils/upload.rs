//! Common utilities for file upload handlers

use crate::services::ingest::{AuthorizedUpload, IngestionOrchestrator, UploadKind};
use axum::extract::Multipart;
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tubely_core::{AppError, Video};

/// Lowercased `type/subtype` with parameters stripped: `Video/MP4; codecs=x` -> `video/mp4`.
pub fn normalize_media_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Normalize `raw` and require it to be one of `allowed`.
///
/// A missing type is a malformed request (400); a declared type outside
/// `allowed` is unsupported (415).
pub fn validate_media_type(raw: &str, allowed: &[&str]) -> Result<String, AppError> {
    let media_type = normalize_media_type(raw);
    if media_type.is_empty() {
        return Err(AppError::InvalidInput("Missing Content-Type".to_string()));
    }
    if !allowed.contains(&media_type.as_str()) {
        return Err(AppError::UnsupportedMediaType(format!(
            "Invalid file type: {}. Allowed types: {}",
            media_type,
            allowed.join(", ")
        )));
    }
    Ok(media_type)
}

/// Find the form field for `kind` and stream it through the orchestrator.
///
/// Fields before it are skipped unread. The field body is never buffered in
/// memory; it is read straight into the staging file.
pub async fn ingest_multipart_field(
    orchestrator: &IngestionOrchestrator,
    upload: AuthorizedUpload,
    kind: UploadKind,
    mut multipart: Multipart,
) -> Result<Video, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some(kind.form_field()) {
            continue;
        }

        let media_type = field.content_type().unwrap_or_default().to_string();
        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(reader);

        return orchestrator.ingest(kind, upload, &media_type, reader).await;
    }

    Err(AppError::InvalidInput(format!(
        "Missing form field '{}'",
        kind.form_field()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_media_type() {
        assert_eq!(normalize_media_type("video/mp4"), "video/mp4");
        assert_eq!(normalize_media_type(" Video/MP4 ; codecs=avc1"), "video/mp4");
        assert_eq!(normalize_media_type(""), "");
    }

    #[test]
    fn test_validate_media_type() {
        let allowed = &["image/jpeg", "image/png"];
        assert_eq!(validate_media_type("image/PNG", allowed).unwrap(), "image/png");
        assert!(matches!(
            validate_media_type("image/gif", allowed),
            Err(AppError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_missing_media_type_is_bad_request() {
        let allowed = &["video/mp4"];
        for raw in ["", "   ", "; charset=utf-8"] {
            assert!(
                matches!(
                    validate_media_type(raw, allowed),
                    Err(AppError::InvalidInput(ref msg)) if msg == "Missing Content-Type"
                ),
                "{:?}",
                raw
            );
        }
    }
}
