//! Tubely Processing Library
//!
//! Local media handling for the ingestion pipeline: staging request bodies to
//! disk, probing stream dimensions with ffprobe and remuxing MP4 files for
//! fast-start playback with ffmpeg.
//!
//! Every intermediate file is a [`StagedFile`], which deletes itself on drop.

pub mod staging;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod video;

pub use staging::{StagedFile, Stager, StagingError};
pub use video::probe::{Dimensions, FfprobeProber, MediaProber, ProbeError};
pub use video::remux::{FastStartRemuxer, FfmpegRemuxer, RemuxError};
