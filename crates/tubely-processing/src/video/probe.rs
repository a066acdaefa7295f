//! Stream dimension probing and orientation classification

use crate::staging::StagedFile;
use crate::video::{stderr_tail, validate_tool_path};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tubely_core::{AppError, Orientation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[source] io::Error),

    #[error("ffprobe exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("ffprobe timed out after {0:?}")]
    TimedOut(Duration),

    #[error("could not parse ffprobe output: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("no video streams found")]
    NoVideoStream,

    #[error("invalid video dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

impl From<ProbeError> for AppError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::TimedOut(_) => AppError::Timeout(err.to_string()),
            other => AppError::Probe(other.to_string()),
        }
    }
}

/// Reads the dimensions of the first video stream of a staged file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe_dimensions(&self, file: &StagedFile) -> Result<Dimensions, ProbeError>;

    /// Probe and classify by aspect ratio.
    async fn probe(&self, file: &StagedFile) -> Result<Orientation, ProbeError> {
        let dims = self.probe_dimensions(file).await?;
        Ok(Orientation::classify(dims.width, dims.height))
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Parse `ffprobe -print_format json -show_streams` output.
pub(crate) fn parse_dimensions(stdout: &[u8]) -> Result<Dimensions, ProbeError> {
    let output: FfprobeOutput = serde_json::from_slice(stdout).map_err(ProbeError::Parse)?;
    let stream = output.streams.first().ok_or(ProbeError::NoVideoStream)?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(ProbeError::InvalidDimensions { width, height });
    }

    Ok(Dimensions { width, height })
}

/// `MediaProber` backed by the ffprobe binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: String,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: String, timeout: Duration) -> Result<Self> {
        validate_tool_path(&ffprobe_path).context("Invalid ffprobe_path")?;
        Ok(Self {
            ffprobe_path,
            timeout,
        })
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    #[tracing::instrument(skip(self, file), fields(
        process.executable.path = %self.ffprobe_path,
        path = %file.path().display()
    ))]
    async fn probe_dimensions(&self, file: &StagedFile) -> Result<Dimensions, ProbeError> {
        let start = std::time::Instant::now();

        let mut command = Command::new(&self.ffprobe_path);
        command
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ProbeError::TimedOut(self.timeout))?
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr, 1024),
            });
        }

        let dims = parse_dimensions(&output.stdout)?;

        tracing::debug!(
            width = dims.width,
            height = dims.height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "ffprobe completed"
        );

        Ok(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::Stager;
    use crate::testing::{fake_tool, process_lock, StubProber};
    use tempfile::tempdir;

    #[test]
    fn test_parse_dimensions() {
        let json = br#"{"streams":[{"index":0,"codec_type":"video","width":1920,"height":1080}]}"#;
        assert_eq!(
            parse_dimensions(json).unwrap(),
            Dimensions {
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn test_parse_no_streams() {
        assert!(matches!(
            parse_dimensions(br#"{"streams":[]}"#),
            Err(ProbeError::NoVideoStream)
        ));
        assert!(matches!(
            parse_dimensions(b"{}"),
            Err(ProbeError::NoVideoStream)
        ));
    }

    #[test]
    fn test_parse_zero_or_missing_dimensions() {
        assert!(matches!(
            parse_dimensions(br#"{"streams":[{"width":0,"height":1080}]}"#),
            Err(ProbeError::InvalidDimensions { width: 0, .. })
        ));
        assert!(matches!(
            parse_dimensions(br#"{"streams":[{"codec_type":"video"}]}"#),
            Err(ProbeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_dimensions(b"not json"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_classifies_with_stub() {
        let dir = tempdir().unwrap();
        let staged = Stager::new(dir.path())
            .stage(&b"x"[..], 10, ".mp4")
            .await
            .unwrap();

        let prober = StubProber::new(1080, 1920);
        assert_eq!(prober.probe(&staged).await.unwrap(), Orientation::Portrait);
        assert_eq!(prober.calls(), 1);
    }

    #[tokio::test]
    async fn test_ffprobe_adapter_reads_json() {
        let _guard = process_lock().lock().await;
        let dir = tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            "ffprobe",
            r#"echo '{"streams":[{"index":0,"width":1280,"height":720}]}'"#,
        );
        let staged = Stager::new(dir.path())
            .stage(&b"mp4"[..], 10, ".mp4")
            .await
            .unwrap();

        let prober = FfprobeProber::new(tool, Duration::from_secs(10)).unwrap();
        assert_eq!(prober.probe(&staged).await.unwrap(), Orientation::Landscape);
    }

    #[tokio::test]
    async fn test_ffprobe_adapter_non_zero_exit() {
        let _guard = process_lock().lock().await;
        let dir = tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            "ffprobe",
            "echo 'Invalid data found when processing input' >&2; exit 1",
        );
        let staged = Stager::new(dir.path())
            .stage(&b"junk"[..], 10, ".mp4")
            .await
            .unwrap();

        let prober = FfprobeProber::new(tool, Duration::from_secs(10)).unwrap();
        match prober.probe(&staged).await {
            Err(ProbeError::Failed { stderr, .. }) => {
                assert!(stderr.contains("Invalid data"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ffprobe_adapter_timeout() {
        let _guard = process_lock().lock().await;
        let dir = tempdir().unwrap();
        let tool = fake_tool(dir.path(), "ffprobe", "sleep 5");
        let staged = Stager::new(dir.path())
            .stage(&b"mp4"[..], 10, ".mp4")
            .await
            .unwrap();

        let prober = FfprobeProber::new(tool, Duration::from_millis(200)).unwrap();
        let err = prober.probe(&staged).await.unwrap_err();
        assert!(matches!(err, ProbeError::TimedOut(_)));

        let app: AppError = err.into();
        assert_eq!(app.error_type(), "Timeout");
    }

    #[tokio::test]
    async fn test_ffprobe_missing_binary() {
        let _guard = process_lock().lock().await;
        let dir = tempdir().unwrap();
        let staged = Stager::new(dir.path())
            .stage(&b"mp4"[..], 10, ".mp4")
            .await
            .unwrap();

        let prober = FfprobeProber::new(
            "/nonexistent/ffprobe".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(
            prober.probe(&staged).await,
            Err(ProbeError::Spawn(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg and ffprobe on PATH"]
    async fn test_real_ffprobe_on_generated_clip() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        let status = tokio::process::Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-f",
                "lavfi",
                "-i",
                "testsrc=size=640x360:duration=1",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&clip)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let body = tokio::fs::read(&clip).await.unwrap();
        let staged = Stager::new(dir.path())
            .stage(body.as_slice(), 10 << 20, ".mp4")
            .await
            .unwrap();

        let prober = FfprobeProber::new("ffprobe".to_string(), Duration::from_secs(30)).unwrap();
        assert_eq!(prober.probe(&staged).await.unwrap(), Orientation::Landscape);
    }
}
