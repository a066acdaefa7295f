//! Fast-start remuxing: move the MP4 index (moov atom) ahead of the media data
//! with a stream copy, so playback can start before the download finishes.

use crate::staging::{StagedFile, StagingError};
use crate::video::{stderr_tail, validate_tool_path};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tubely_core::AppError;

const OUTPUT_SUFFIX: &str = ".processing.mp4";

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("failed to run ffmpeg: {0}")]
    Spawn(#[source] io::Error),

    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("ffmpeg timed out after {0:?}")]
    TimedOut(Duration),

    #[error("ffmpeg produced no output")]
    NoOutput,

    #[error("failed to reserve output file: {0}")]
    Output(#[from] StagingError),
}

impl From<RemuxError> for AppError {
    fn from(err: RemuxError) -> Self {
        match err {
            RemuxError::TimedOut(_) => AppError::Timeout(err.to_string()),
            other => AppError::Remux(other.to_string()),
        }
    }
}

/// Rewrites a staged MP4 for progressive playback.
///
/// Implementations never delete `input`; the caller owns both files.
#[async_trait]
pub trait FastStartRemuxer: Send + Sync {
    async fn remux(&self, input: &StagedFile) -> Result<StagedFile, RemuxError>;
}

/// `FastStartRemuxer` backed by the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    ffmpeg_path: String,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(ffmpeg_path: String, timeout: Duration) -> Result<Self> {
        validate_tool_path(&ffmpeg_path).context("Invalid ffmpeg_path")?;
        Ok(Self {
            ffmpeg_path,
            timeout,
        })
    }
}

#[async_trait]
impl FastStartRemuxer for FfmpegRemuxer {
    #[tracing::instrument(skip(self, input), fields(
        process.executable.path = %self.ffmpeg_path,
        input = %input.path().display()
    ))]
    async fn remux(&self, input: &StagedFile) -> Result<StagedFile, RemuxError> {
        let start = std::time::Instant::now();
        let output_file = input.reserve_sibling(OUTPUT_SUFFIX)?;

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-y", "-v", "error", "-i"])
            .arg(input.path())
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(output_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RemuxError::TimedOut(self.timeout))?
            .map_err(RemuxError::Spawn)?;

        if !output.status.success() {
            let stderr = stderr_tail(&output.stderr, 2048);
            tracing::warn!(status = %output.status, stderr = %stderr, "ffmpeg remux failed");
            return Err(RemuxError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let size = output_file.size().await.map_err(|_| RemuxError::NoOutput)?;
        if size == 0 {
            return Err(RemuxError::NoOutput);
        }

        tracing::debug!(
            output = %output_file.path().display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "ffmpeg remux completed"
        );

        Ok(output_file)
    }
}
