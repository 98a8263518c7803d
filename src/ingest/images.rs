use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub(crate) fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Frames read one image file at a time, in file-name order.
pub(crate) struct ImageSequenceSource {
    locator: String,
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    /// Open a directory of frames, or a single image as a one-frame stream.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let paths = if path.is_dir() {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(path)
                .with_context(|| format!("failed to list {}", path.display()))?
            {
                let entry_path = entry?.path();
                if entry_path.is_file() && is_image_path(&entry_path) {
                    paths.push(entry_path);
                }
            }
            paths.sort();
            paths
        } else {
            vec![path.to_path_buf()]
        };
        if paths.is_empty() {
            return Err(anyhow!("{} contains no image frames", path.display()));
        }
        log::info!(
            "FileSource: {} image frames in {}",
            paths.len(),
            path.display()
        );
        Ok(Self {
            locator: path.display().to_string(),
            paths,
            next: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let frame = image::open(path)
            .with_context(|| format!("failed to decode frame {}", path.display()))?
            .to_rgb8();
        self.next += 1;
        Ok(Some(frame))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.next as u64,
            locator: self.locator.clone(),
        }
    }
}
