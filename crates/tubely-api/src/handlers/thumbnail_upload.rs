use crate::auth::bearer_token;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::UploadKind;
use crate::state::AppState;
use crate::utils::upload::ingest_multipart_field;
use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;
use tubely_core::Video;

#[utoipa::path(
    post,
    path = "/api/videos/{video_id}/thumbnail",
    tag = "videos",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Form field `thumbnail` holding a JPEG or PNG image"),
    responses(
        (status = 200, description = "Thumbnail uploaded successfully", body = Video),
        (status = 400, description = "Invalid video ID or form", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token, or not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported media type", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(video_id = %video_id))]
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Video>, HttpAppError> {
    let credential = bearer_token(&headers)?;
    let upload = state.ingest.authorize(credential, &video_id).await?;

    let video =
        ingest_multipart_field(&state.ingest, upload, UploadKind::Thumbnail, multipart).await?;

    Ok(Json(video))
}
