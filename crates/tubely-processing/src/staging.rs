//! Staging of request bodies to local disk.
//!
//! A [`StagedFile`] owns its path and removes the file when dropped, so every
//! exit path of a request (early return, error, panic unwind) cleans up.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tubely_core::AppError;

const STAGED_PREFIX: &str = "tubely-upload-";
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("upload exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to create staging file in {dir}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read upload body: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write staging file: {0}")]
    Write(#[source] io::Error),
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::TooLarge { limit } => AppError::PayloadTooLarge(format!(
                "File exceeds the maximum size of {} bytes",
                limit
            )),
            other => AppError::Staging(other.to_string()),
        }
    }
}

/// Creates staged files inside one directory.
#[derive(Debug, Clone)]
pub struct Stager {
    dir: PathBuf,
}

impl Stager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stream `reader` into a new staged file, accepting at most `size_limit` bytes.
    ///
    /// Fails with [`StagingError::TooLarge`] as soon as byte `size_limit + 1`
    /// arrives; nothing past the limit is written. On any error the partial
    /// file is removed before returning.
    pub async fn stage<R>(
        &self,
        mut reader: R,
        size_limit: u64,
        suffix: &str,
    ) -> Result<StagedFile, StagingError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (std_file, path) = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.dir)
            .map_err(|source| StagingError::Create {
                dir: self.dir.clone(),
                source,
            })?
            .into_parts();
        let staged = StagedFile { path };
        let mut file = File::from_std(std_file);

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = reader.read(&mut buf).await.map_err(StagingError::Read)?;
            if n == 0 {
                break;
            }
            written += n as u64;
            if written > size_limit {
                tracing::debug!(
                    path = %staged.path().display(),
                    limit = size_limit,
                    "Upload exceeded size limit, discarding staged file"
                );
                return Err(StagingError::TooLarge { limit: size_limit });
            }
            file.write_all(&buf[..n]).await.map_err(StagingError::Write)?;
        }

        file.flush().await.map_err(StagingError::Write)?;
        file.sync_all().await.map_err(StagingError::Write)?;

        tracing::debug!(
            path = %staged.path().display(),
            size_bytes = written,
            "Upload staged"
        );

        Ok(staged)
    }
}

/// A request-scoped file on local disk, deleted on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size on disk right now.
    pub async fn size(&self) -> io::Result<u64> {
        Ok(tokio::fs::metadata(self.path()).await?.len())
    }

    /// Fresh read handle positioned at the start of the file.
    pub async fn open(&self) -> io::Result<File> {
        File::open(self.path()).await
    }

    /// Create an empty staged file next to this one, e.g. for a tool's output.
    pub fn reserve_sibling(&self, suffix: &str) -> Result<StagedFile, StagingError> {
        let dir = self
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        let path = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(suffix)
            .tempfile_in(&dir)
            .map_err(|source| StagingError::Create { dir, source })?
            .into_temp_path();
        Ok(StagedFile { path })
    }

    /// Delete now and report failure, instead of the silent removal on drop.
    pub fn close(self) -> io::Result<()> {
        self.path.close()
    }
}
