//! The per-frame detector.
//!
//! `MotionDetector` owns the background model for one run and applies
//! model → erode → extract → select → annotate to each frame in order.

use anyhow::{Context, Result};

use crate::annotate::{annotate, AnnotationStyle};
use crate::config::MotionConfig;
use crate::detect::{build_model, erode, extract, select, BackgroundModel, Region, SelectionParams};
use crate::frame::{frame_area, Frame};

pub struct MotionDetector {
    model: Box<dyn BackgroundModel>,
    erosion_kernel_size: u32,
    selection: SelectionParams,
    style: AnnotationStyle,
}

impl MotionDetector {
    pub fn new(config: &MotionConfig) -> Self {
        Self::with_model(
            build_model(&config.model),
            config.erosion_kernel_size,
            config.selection.clone(),
            config.style.clone(),
        )
    }

    pub fn with_model(
        model: Box<dyn BackgroundModel>,
        erosion_kernel_size: u32,
        selection: SelectionParams,
        style: AnnotationStyle,
    ) -> Self {
        log::debug!(
            "MotionDetector: model={} kernel={} max_regions={} warmup={}",
            model.name(),
            erosion_kernel_size,
            selection.max_regions,
            selection.warmup_frames
        );
        Self {
            model,
            erosion_kernel_size,
            selection,
            style,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Run one pipeline pass over `frame` and annotate it in place.
    ///
    /// `frame_index` is the 1-based position of the frame in the stream. The
    /// model is updated on every call, including warm-up frames whose output
    /// is suppressed. Returns the regions drawn onto the frame.
    pub fn process(&mut self, frame: &mut Frame, frame_index: u64) -> Result<Vec<Region>> {
        let mask = self
            .model
            .apply(frame)
            .with_context(|| format!("background model failed on frame {}", frame_index))?;
        let cleaned = erode(&mask, self.erosion_kernel_size)?;
        let regions = extract(&cleaned);
        let candidates = regions.len();
        let selected = select(regions, frame_area(frame), frame_index, &self.selection);

        if !selected.is_empty() {
            log::debug!(
                "frame {}: {} of {} regions selected, largest area {}",
                frame_index,
                selected.len(),
                candidates,
                selected[0].area
            );
        }
        annotate(frame, &selected, &self.style);
        Ok(selected)
    }
}
