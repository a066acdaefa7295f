//! Test doubles for the ffprobe/ffmpeg adapters.

use crate::staging::StagedFile;
use crate::video::probe::{Dimensions, MediaProber, ProbeError};
use crate::video::remux::{FastStartRemuxer, RemuxError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prober that reports fixed dimensions, or fails with no video stream.
#[derive(Debug)]
pub struct StubProber {
    dims: Option<Dimensions>,
    calls: AtomicUsize,
}

impl StubProber {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dims: Some(Dimensions { width, height }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            dims: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProber for StubProber {
    async fn probe_dimensions(&self, _file: &StagedFile) -> Result<Dimensions, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.dims.ok_or(ProbeError::NoVideoStream)
    }
}

/// Remuxer that copies the input verbatim, or fails like a corrupt file.
#[derive(Debug, Default)]
pub struct StubRemuxer {
    fail: bool,
    calls: AtomicUsize,
}

impl StubRemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FastStartRemuxer for StubRemuxer {
    async fn remux(&self, input: &StagedFile) -> Result<StagedFile, RemuxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = input.reserve_sibling(".processing.mp4")?;
        if self.fail {
            return Err(RemuxError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "moov atom not found".to_string(),
            });
        }
        tokio::fs::copy(input.path(), output.path())
            .await
            .map_err(RemuxError::Spawn)?;
        Ok(output)
    }
}

/// Serializes tests that write and exec shell scripts; exec of a script
/// another thread still holds open for writing fails with ETXTBSY.
#[cfg(test)]
pub(crate) fn process_lock() -> &'static tokio::sync::Mutex<()> {
    static LOCK: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    LOCK.get_or_init(|| tokio::sync::Mutex::new(()))
}

/// Write an executable `/bin/sh` script standing in for ffprobe or ffmpeg.
#[cfg(test)]
pub(crate) fn fake_tool(dir: &std::path::Path, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().to_string()
}
