//! Ingestion Orchestrator
//!
//! Drives one upload through
//! `Authenticate -> Authorize -> Validate -> Stage -> Probe -> Remux -> Publish -> Commit`,
//! stopping at the first failure. Staged files are dropped (and deleted) on
//! every exit path, and the metadata store is only touched once the object is
//! safely published.

use crate::auth::Authenticator;
use crate::utils::upload::validate_media_type;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncRead;
use tubely_core::constants::{
    THUMBNAIL_ALLOWED_CONTENT_TYPES, THUMBNAIL_FORM_FIELD, VIDEO_ALLOWED_CONTENT_TYPES,
    VIDEO_FORM_FIELD,
};
use tubely_core::{AppError, ErrorMetadata, IngestConfig, LogLevel, Video};
use tubely_db::VideoRepository;
use tubely_processing::{FastStartRemuxer, MediaProber, StagedFile, Stager};
use tubely_storage::{ObjectKey, ObjectReference, Storage};
use uuid::Uuid;

/// What an upload replaces on the video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Video,
    Thumbnail,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Video => "video",
            UploadKind::Thumbnail => "thumbnail",
        }
    }

    /// Multipart field the file is sent in.
    pub fn form_field(&self) -> &'static str {
        match self {
            UploadKind::Video => VIDEO_FORM_FIELD,
            UploadKind::Thumbnail => THUMBNAIL_FORM_FIELD,
        }
    }

    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Video => VIDEO_ALLOWED_CONTENT_TYPES,
            UploadKind::Thumbnail => THUMBNAIL_ALLOWED_CONTENT_TYPES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Authenticate,
    Authorize,
    Validate,
    Stage,
    Probe,
    Remux,
    Publish,
    Commit,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Authenticate => "authenticate",
            Stage::Authorize => "authorize",
            Stage::Validate => "validate",
            Stage::Stage => "stage",
            Stage::Probe => "probe",
            Stage::Remux => "remux",
            Stage::Publish => "publish",
            Stage::Commit => "commit",
        }
    }
}

fn at<E: Into<AppError>>(stage: Stage) -> impl FnOnce(E) -> (Stage, AppError) {
    move |err| (stage, err.into())
}

fn record_failure(stage: Stage, video_id: &dyn Display, user_id: Option<Uuid>, err: &AppError) {
    let user_id = user_id.map(tracing::field::display);
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            video_id = %video_id,
            user_id,
            stage = stage.as_str(),
            error = %err,
            "Upload rejected"
        ),
        LogLevel::Warn => tracing::warn!(
            video_id = %video_id,
            user_id,
            stage = stage.as_str(),
            error = %err,
            "Upload rejected"
        ),
        LogLevel::Error => tracing::error!(
            video_id = %video_id,
            user_id,
            stage = stage.as_str(),
            error = %err.detailed_message(),
            "Upload failed"
        ),
    }
}

/// Delete a staged file as soon as it is no longer needed.
fn discard(file: StagedFile) {
    let path = file.path().display().to_string();
    if let Err(e) = file.close() {
        tracing::warn!(path = %path, error = %e, "Failed to remove staged file");
    }
}

/// Proof that the caller owns the target video. Only
/// [`IngestionOrchestrator::authorize`] creates one, and nothing is staged
/// without it.
#[derive(Debug)]
pub struct AuthorizedUpload {
    user_id: Uuid,
    video: Video,
}

impl AuthorizedUpload {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn into_video(self) -> Video {
        self.video
    }
}

/// A complete upload for callers that are not the HTTP layer.
pub struct UploadRequest<R> {
    pub credential: String,
    pub video_id: String,
    pub media_type: String,
    pub body: R,
}

pub struct IngestionOrchestrator {
    authenticator: Arc<dyn Authenticator>,
    videos: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    prober: Arc<dyn MediaProber>,
    remuxer: Arc<dyn FastStartRemuxer>,
    stager: Stager,
    max_video_size: u64,
    max_thumbnail_size: u64,
}

impl IngestionOrchestrator {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        videos: Arc<dyn VideoRepository>,
        storage: Arc<dyn Storage>,
        prober: Arc<dyn MediaProber>,
        remuxer: Arc<dyn FastStartRemuxer>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            authenticator,
            videos,
            storage,
            prober,
            remuxer,
            stager: Stager::new(config.staging_dir()),
            max_video_size: config.max_video_size_bytes,
            max_thumbnail_size: config.max_thumbnail_size_bytes,
        }
    }

    /// Resolve the caller and check they own `video_id`.
    pub async fn authorize(
        &self,
        credential: &str,
        video_id: &str,
    ) -> Result<AuthorizedUpload, AppError> {
        let user_id = self
            .authenticator
            .authenticate(credential)
            .await
            .inspect_err(|e| record_failure(Stage::Authenticate, &video_id, None, e))?;

        let fail = |e: &AppError| record_failure(Stage::Authorize, &video_id, Some(user_id), e);

        let id = Uuid::parse_str(video_id)
            .map_err(AppError::from)
            .inspect_err(fail)?;

        let video = self
            .videos
            .get_video(id)
            .await
            .inspect_err(fail)?
            .ok_or_else(|| AppError::NotFound(format!("Couldn't find video {}", id)))
            .inspect_err(fail)?;

        if !video.is_owned_by(user_id) {
            let err = AppError::Unauthorized("Not authorized to update this video".to_string());
            fail(&err);
            return Err(err);
        }

        Ok(AuthorizedUpload { user_id, video })
    }

    /// Run an authorized upload of `kind` and return the updated record.
    pub async fn ingest<R>(
        &self,
        kind: UploadKind,
        upload: AuthorizedUpload,
        media_type: &str,
        body: R,
    ) -> Result<Video, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let AuthorizedUpload { user_id, video } = upload;
        let video_id = video.id;
        let started = Instant::now();

        let result = match kind {
            UploadKind::Video => self.run_video(video, media_type, body).await,
            UploadKind::Thumbnail => self.run_thumbnail(video, media_type, body).await,
        };

        match result {
            Ok(video) => {
                tracing::info!(
                    video_id = %video_id,
                    user_id = %user_id,
                    kind = kind.as_str(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Upload ingested"
                );
                Ok(video)
            }
            Err((stage, err)) => {
                record_failure(stage, &video_id, Some(user_id), &err);
                Err(err)
            }
        }
    }

    pub async fn ingest_video<R>(
        &self,
        upload: AuthorizedUpload,
        media_type: &str,
        body: R,
    ) -> Result<Video, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.ingest(UploadKind::Video, upload, media_type, body)
            .await
    }

    pub async fn ingest_thumbnail<R>(
        &self,
        upload: AuthorizedUpload,
        media_type: &str,
        body: R,
    ) -> Result<Video, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.ingest(UploadKind::Thumbnail, upload, media_type, body)
            .await
    }

    /// Authorize and ingest a video in one call.
    pub async fn handle_video<R>(&self, request: UploadRequest<R>) -> Result<Video, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let upload = self
            .authorize(&request.credential, &request.video_id)
            .await?;
        self.ingest_video(upload, &request.media_type, request.body)
            .await
    }

    async fn run_video<R>(
        &self,
        video: Video,
        media_type: &str,
        body: R,
    ) -> Result<Video, (Stage, AppError)>
    where
        R: AsyncRead + Unpin + Send,
    {
        let media_type = validate_media_type(media_type, UploadKind::Video.allowed_types())
            .map_err(at(Stage::Validate))?;

        let staged = self
            .stager
            .stage(body, self.max_video_size, ".mp4")
            .await
            .map_err(at(Stage::Stage))?;

        let orientation = self.prober.probe(&staged).await.map_err(at(Stage::Probe))?;
        tracing::debug!(video_id = %video.id, orientation = %orientation, "Video probed");

        let processed = self.remuxer.remux(&staged).await.map_err(at(Stage::Remux))?;
        discard(staged);

        let key = ObjectKey::for_video(orientation, &media_type);
        let reference = self
            .publish(&processed, &key, &media_type)
            .await
            .map_err(at(Stage::Publish))?;
        discard(processed);

        self.commit(UploadKind::Video, video, reference).await
    }

    async fn run_thumbnail<R>(
        &self,
        video: Video,
        media_type: &str,
        body: R,
    ) -> Result<Video, (Stage, AppError)>
    where
        R: AsyncRead + Unpin + Send,
    {
        let media_type = validate_media_type(media_type, UploadKind::Thumbnail.allowed_types())
            .map_err(at(Stage::Validate))?;
        let suffix = media_type
            .split_once('/')
            .map(|(_, subtype)| format!(".{}", subtype))
            .unwrap_or_default();

        let staged = self
            .stager
            .stage(body, self.max_thumbnail_size, &suffix)
            .await
            .map_err(at(Stage::Stage))?;

        let key = ObjectKey::for_thumbnail(&media_type);
        let reference = self
            .publish(&staged, &key, &media_type)
            .await
            .map_err(at(Stage::Publish))?;
        discard(staged);

        self.commit(UploadKind::Thumbnail, video, reference).await
    }

    /// Upload timeouts are enforced by the storage backend, which aborts the
    /// transfer itself.
    async fn publish(
        &self,
        file: &StagedFile,
        key: &ObjectKey,
        media_type: &str,
    ) -> Result<ObjectReference, AppError> {
        Ok(self.storage.publish(file.path(), key, media_type).await?)
    }

    /// Point the record at the published object. The object is not removed
    /// if this fails.
    async fn commit(
        &self,
        kind: UploadKind,
        mut video: Video,
        reference: ObjectReference,
    ) -> Result<Video, (Stage, AppError)> {
        match kind {
            UploadKind::Video => video.set_video_url(reference.url.clone()),
            UploadKind::Thumbnail => video.set_thumbnail_url(reference.url.clone()),
        }

        self.videos.update_video(&video).await.map_err(|err| {
            tracing::warn!(
                video_id = %video.id,
                object_key = %reference.key,
                "Metadata update failed, published object is orphaned"
            );
            (Stage::Commit, err)
        })
    }
}
