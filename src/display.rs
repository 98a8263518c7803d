//! Display sinks receiving annotated frames in frame order.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::frame::Frame;

/// Receives every processed frame, once, in order.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame) -> Result<()>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        (**self).show(frame)
    }
}

/// Discards frames, counting them.
#[derive(Debug, Default)]
pub struct NullSink {
    pub frames_shown: u64,
}

impl DisplaySink for NullSink {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.frames_shown += 1;
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub frames: Vec<Frame>,
}

impl DisplaySink for CollectingSink {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Writes numbered PNG files (`frame_000001.png`, ...) into a directory.
pub struct ImageDirSink {
    dir: PathBuf,
    next_index: u64,
}

impl ImageDirSink {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        log::info!("ImageDirSink: writing frames to {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            next_index: 1,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.next_index - 1
    }
}

impl DisplaySink for ImageDirSink {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.next_index));
        frame
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.next_index += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn image_dir_sink_numbers_frames() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("annotated");
        let mut sink = ImageDirSink::create(&out)?;
        sink.show(&Frame::from_pixel(3, 2, Rgb([1, 2, 3])))?;
        sink.show(&Frame::from_pixel(3, 2, Rgb([4, 5, 6])))?;
        assert_eq!(sink.frames_written(), 2);

        let second = image::open(out.join("frame_000002.png"))?.to_rgb8();
        assert_eq!(second.get_pixel(2, 1), &Rgb([4, 5, 6]));
        assert!(out.join("frame_000001.png").exists());
        Ok(())
    }

    #[test]
    fn borrowed_sink_forwards() -> Result<()> {
        fn deliver<S: DisplaySink>(mut sink: S) -> Result<()> {
            sink.show(&Frame::new(1, 1))
        }

        let mut sink = CollectingSink::default();
        deliver(&mut sink)?;
        deliver(&mut sink)?;
        assert_eq!(sink.frames.len(), 2);
        Ok(())
    }
}
