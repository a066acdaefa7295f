//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that
//! converts into `AppError` converts into `HttpAppError` through `?`, and is
//! rendered with the status, code and client message its `ErrorMetadata`
//! describes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tubely_core::{AppError, ErrorMetadata};
use utoipa::ToSchema;

static PRODUCTION: AtomicBool = AtomicBool::new(false);

/// Hide error details from every response. Set once at startup from `Config`.
pub fn set_production_mode(production: bool) {
    PRODUCTION.store(production, Ordering::Relaxed);
}

fn is_production() -> bool {
    PRODUCTION.load(Ordering::Relaxed)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(error: &AppError, with_details: bool) -> Self {
        let (details, error_type) = if with_details {
            (
                Some(error.detailed_message()),
                Some(error.error_type().to_string()),
            )
        } else {
            (None, None)
        };

        Self {
            error: error.client_message(),
            details,
            error_type,
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse.
/// `IntoResponse` and `AppError` are both foreign to this crate.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

/// Failures are logged with their context where they happen; the response
/// side only leaves a debug trace.
fn log_response(error: &AppError, status: StatusCode) {
    tracing::debug!(
        status = status.as_u16(),
        code = error.error_code(),
        error_type = error.error_type(),
        "Request failed"
    );
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_response(app_error, status);

        // Details only leave the process for non-sensitive errors outside production.
        let with_details = !is_production() && !app_error.is_sensitive();
        let body = ErrorResponse::from_app_error(app_error, with_details);

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tubely_processing::StagingError;
    use tubely_storage::StorageError;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = HttpAppError(err).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unsupported_media_type_response() {
        let (status, body) = render(AppError::UnsupportedMediaType(
            "Invalid file type: video/quicktime".to_string(),
        ))
        .await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");
        assert_eq!(body["error"], "Invalid file type: video/quicktime");
        assert_eq!(body["recoverable"], false);
        assert_eq!(body["error_type"], "UnsupportedMediaType");
    }

    #[tokio::test]
    async fn test_sensitive_errors_hide_details() {
        let (status, body) = render(AppError::Remux(
            "ffmpeg exited with exit status: 1: moov atom not found".to_string(),
        ))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Couldn't process video");
        assert!(body.get("details").is_none());
        assert!(body.get("error_type").is_none());
        assert!(!body.to_string().contains("moov"));
    }

    #[tokio::test]
    async fn test_staging_too_large_is_413() {
        let err = HttpAppError(StagingError::TooLarge { limit: 10 }.into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_storage_error_is_500() {
        let (status, body) = render(StorageError::UploadFailed("denied".to_string()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "STORAGE_ERROR");
        assert_eq!(body["error"], "Couldn't upload file");
    }

    #[test]
    fn test_response_does_not_relog_server_errors() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let status = tracing::subscriber::with_default(subscriber, || {
            HttpAppError(AppError::Remux("ffmpeg exited with exit status: 1".to_string()))
                .into_response()
                .status()
        });

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(captured.0.lock().unwrap().is_empty());
    }
}
