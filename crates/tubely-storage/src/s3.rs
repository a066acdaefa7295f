use crate::keys::ObjectKey;
use crate::traits::{ObjectReference, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, MultipartUpload, ObjectStore, ObjectStoreExt, PutPayload,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;

/// Files up to this size go up in a single put; larger ones as a multipart
/// upload of parts this size. S3 requires parts of at least 5 MiB.
const DEFAULT_PART_SIZE: usize = 10 * 1024 * 1024;

/// Object-store backed storage (Amazon S3 or any S3-compatible provider)
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    url_base: String,
    part_size: usize,
    upload_timeout: Option<Duration>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `public_base_url` - Optional base URL objects are served from, e.g. a CDN
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the usual AWS_* environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let url_base = base_url(&bucket, &region, endpoint_url.as_deref(), public_base_url.as_deref());

        Ok(S3Storage {
            store: Arc::new(store),
            bucket,
            url_base,
            part_size: DEFAULT_PART_SIZE,
            upload_timeout: None,
        })
    }

    /// Wrap an already-built object store. Used with `object_store::memory::InMemory`
    /// in tests and for providers configured outside this crate.
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: String, url_base: String) -> Self {
        S3Storage {
            store,
            bucket,
            url_base: url_base.trim_end_matches('/').to_string(),
            part_size: DEFAULT_PART_SIZE,
            upload_timeout: None,
        }
    }

    /// Fail any publish that takes longer than `timeout`. A multipart upload
    /// cut off by the timeout is aborted.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = Some(timeout);
        self
    }

    /// Multipart part size, which is also the single-put threshold.
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    /// Run `fut` unless the upload deadline passes first.
    async fn before_deadline<F: Future>(
        &self,
        deadline: Option<Instant>,
        location: &ObjectPath,
        fut: F,
    ) -> StorageResult<F::Output> {
        let Some(deadline) = deadline else {
            return Ok(fut.await);
        };
        tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
            StorageError::Timeout(format!(
                "upload of {} exceeded {:?}",
                location,
                self.upload_timeout.unwrap_or_default()
            ))
        })
    }

    async fn put_single(
        &self,
        file: &mut File,
        location: &ObjectPath,
        size: u64,
        attributes: Attributes,
        deadline: Option<Instant>,
    ) -> StorageResult<()> {
        let mut body = Vec::with_capacity(size as usize);
        file.read_to_end(&mut body).await?;

        let put = self
            .store
            .put_opts(location, PutPayload::from(body), attributes.into());
        self.before_deadline(deadline, location, put)
            .await?
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Ok(())
    }

    async fn put_multipart(
        &self,
        file: &mut File,
        location: &ObjectPath,
        attributes: Attributes,
        deadline: Option<Instant>,
    ) -> StorageResult<()> {
        let start = self.store.put_multipart_opts(location, attributes.into());
        let mut upload = self
            .before_deadline(deadline, location, start)
            .await?
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let sent = self
            .before_deadline(
                deadline,
                location,
                send_parts(file, upload.as_mut(), self.part_size),
            )
            .await
            .and_then(|result| result);

        if let Err(e) = sent {
            self.abort_upload(upload.as_mut(), location).await;
            return Err(e);
        }
        Ok(())
    }

    /// Abort a failed multipart upload; the original error wins.
    async fn abort_upload(&self, upload: &mut dyn MultipartUpload, location: &ObjectPath) {
        if let Err(e) = upload.abort().await {
            tracing::warn!(
                error = %e,
                bucket = %self.bucket,
                key = %location,
                "Failed to abort S3 upload"
            );
        }
    }
}

/// Stream `file` into `upload` one part at a time, then complete it.
async fn send_parts(
    file: &mut File,
    upload: &mut dyn MultipartUpload,
    part_size: usize,
) -> StorageResult<()> {
    loop {
        let mut part = Vec::with_capacity(part_size);
        (&mut *file).take(part_size as u64).read_to_end(&mut part).await?;
        if part.is_empty() {
            break;
        }
        upload
            .put_part(PutPayload::from(part))
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
    }

    upload
        .complete()
        .await
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
    Ok(())
}

/// Public URL prefix for objects in a bucket.
///
/// A configured public base URL wins. For S3-compatible providers the
/// path-style `{endpoint}/{bucket}` is used, otherwise the standard AWS
/// virtual-hosted URL.
fn base_url(
    bucket: &str,
    region: &str,
    endpoint_url: Option<&str>,
    public_base_url: Option<&str>,
) -> String {
    if let Some(public) = public_base_url {
        return public.trim_end_matches('/').to_string();
    }
    match endpoint_url {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn publish(
        &self,
        source: &Path,
        key: &ObjectKey,
        content_type: &str,
    ) -> StorageResult<ObjectReference> {
        let start = std::time::Instant::now();
        let deadline = self.upload_timeout.map(|timeout| Instant::now() + timeout);
        let location = ObjectPath::from(key.as_str());

        let open_failed = |e: std::io::Error| {
            StorageError::UploadFailed(format!(
                "Failed to open {} for upload: {}",
                source.display(),
                e
            ))
        };
        let mut file = File::open(source).await.map_err(open_failed)?;
        let size = file.metadata().await.map_err(open_failed)?.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let result = if size <= self.part_size as u64 {
            self.put_single(&mut file, &location, size, attributes, deadline)
                .await
        } else {
            self.put_multipart(&mut file, &location, attributes, deadline)
                .await
        };

        if let Err(e) = result {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            return Err(e);
        }

        let url = self.object_url(key.as_str());

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(ObjectReference {
            key: key.as_str().to_string(),
            url,
        })
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let location = ObjectPath::from(key);

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(error = %other, bucket = %self.bucket, key = %key, "S3 download failed");
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = ObjectPath::from(key);
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_base, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
