//! Frame sources.
//!
//! This module provides the sources the control loop can pull frames from:
//! - Synthetic scenes (`stub://`) for tests and demos
//! - Image-sequence directories (PNG/JPEG, sorted by file name)
//! - Local video files (feature: ingest-file-ffmpeg)
//!
//! Sources are local only. Remote URL schemes are refused at open time.
//!
//! A source yields `Ok(Some(frame))` per frame, `Ok(None)` at a clean end of
//! stream, and `Err(_)` when reading fails; the control loop treats the latter
//! as a terminal read failure and never retries.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod images;
mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

pub use file::{discover_videos, FileSource};
pub use synthetic::SyntheticScene;

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub locator: String,
}

/// Forward-only frame stream.
pub trait FrameSource {
    /// Read the next frame. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Frame statistics.
    fn stats(&self) -> SourceStats;

    /// Release the underlying handle. Called once when the loop stops.
    fn close(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
