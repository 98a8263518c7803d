//! Local frame source.
//!
//! `FileSource` resolves a locator into one of the concrete backends:
//! - `stub://...` synthetic scenes
//! - a directory of PNG/JPEG frames, or a single image
//! - a video file decoded with FFmpeg (feature: ingest-file-ffmpeg)
//!
//! Every failure to resolve or open the locator is reported as
//! `PipelineError::CannotOpenSource`, before any frame is read.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::images::{is_image_path, ImageSequenceSource};
use super::synthetic::{SyntheticConfig, SyntheticSource};
use super::{FrameSource, SourceStats};
use crate::frame::Frame;
use crate::PipelineError;

const VIDEO_EXTENSION: &str = "mp4";

/// Local frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    Images(ImageSequenceSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open `locator`. Errors are `PipelineError::CannotOpenSource`.
    pub fn open(locator: &str) -> Result<Self> {
        let backend = open_backend(locator).map_err(|e| PipelineError::CannotOpenSource {
            identifier: locator.to_string(),
            reason: format!("{:#}", e),
        })?;
        let source = Self { backend };
        log::info!("FileSource: connected to {}", locator);
        Ok(source)
    }

    fn inner(&self) -> &dyn FrameSource {
        match &self.backend {
            FileBackend::Synthetic(source) => source,
            FileBackend::Images(source) => source,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FrameSource {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source,
            FileBackend::Images(source) => source,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source,
        }
    }
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.inner_mut().next_frame()
    }

    fn is_healthy(&self) -> bool {
        self.inner().is_healthy()
    }

    fn stats(&self) -> SourceStats {
        self.inner().stats()
    }

    fn close(&mut self) {
        self.inner_mut().close();
        log::info!("FileSource: closed {}", self.stats().locator);
    }
}

fn open_backend(locator: &str) -> Result<FileBackend> {
    if !is_local_file_path(locator) {
        return Err(anyhow!(
            "file ingestion only supports local paths (no URL schemes)"
        ));
    }
    if locator.starts_with("stub://") {
        let config = SyntheticConfig::parse(locator)?;
        return Ok(FileBackend::Synthetic(SyntheticSource::new(locator, config)));
    }

    let path = Path::new(locator);
    if !path.exists() {
        return Err(anyhow!("no such file or directory"));
    }
    if path.is_dir() || is_image_path(path) {
        return Ok(FileBackend::Images(ImageSequenceSource::open(path)?));
    }

    #[cfg(feature = "ingest-file-ffmpeg")]
    {
        Ok(FileBackend::Ffmpeg(FfmpegFileSource::new(locator)?))
    }
    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    {
        Err(anyhow!(
            "video decoding requires the ingest-file-ffmpeg feature"
        ))
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

/// List the `.mp4` files directly inside `dir`, sorted by path.
pub fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow!("failed to list {}: {}", dir.display(), e))?;
    let mut videos = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_video = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(VIDEO_EXTENSION));
        if path.is_file() && is_video {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_error(locator: &str) -> PipelineError {
        let err = FileSource::open(locator).err().expect("open must fail");
        err.downcast_ref::<PipelineError>()
            .cloned()
            .expect("CannotOpenSource")
    }

    #[test]
    fn rejects_remote_and_empty_locators() {
        for locator in ["", "   ", "rtsp://camera-1/stream", "https://example.com/a.mp4"] {
            assert!(matches!(
                open_error(locator),
                PipelineError::CannotOpenSource { .. }
            ));
        }
    }

    #[test]
    fn missing_path_cannot_open() {
        match open_error("/definitely/not/here.mp4") {
            PipelineError::CannotOpenSource { identifier, reason } => {
                assert_eq!(identifier, "/definitely/not/here.mp4");
                assert!(reason.contains("no such file"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn synthetic_locator_opens() -> Result<()> {
        let mut source = FileSource::open("stub://static?width=16&height=8&frames=1")?;
        let frame = source.next_frame()?.expect("frame");
        assert_eq!(frame.dimensions(), (16, 8));
        assert!(source.next_frame()?.is_none());
        source.close();
        Ok(())
    }

    #[test]
    fn discovers_only_mp4_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["b.mp4", "a.MP4", "c.avi", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"")?;
        }
        std::fs::create_dir(dir.path().join("nested.mp4"))?;
        let names: Vec<String> = discover_videos(dir.path())?
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["a.MP4", "b.mp4"]);
        Ok(())
    }
}
