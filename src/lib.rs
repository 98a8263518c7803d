//! Motion Sentry
//!
//! Per-frame motion detection over a forward-only frame stream.
//!
//! # Architecture
//!
//! Every frame flows strictly forward through one pipeline pass:
//!
//! 1. **Background model**: classifies each pixel as foreground or background
//!    and adapts its per-pixel history.
//! 2. **Noise suppression**: square-kernel erosion removes speckle.
//! 3. **Region extraction**: 8-connected components with traced outer contours.
//! 4. **Selection**: warm-up gate, top-K by area, minimum area fraction.
//! 5. **Annotation**: bounding boxes plus a "Motion Detected" banner.
//!
//! The control loop owns the frame counter and the per-run detector, pulls
//! frames from a source and hands annotated frames to a display sink.
//!
//! # Module Structure
//!
//! - `frame`: Frame and mask types, color conversion
//! - `ingest`: Frame sources (synthetic, image sequences, video files)
//! - `detect`: Background models, erosion, contours, selection
//! - `annotate`: Outline and banner drawing
//! - `pipeline`: The per-frame detector
//! - `control`: Idle/Running/Stopped control loop and signals
//! - `display`: Display sinks

pub mod annotate;
pub mod config;
pub mod control;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod pipeline;

pub use annotate::{annotate, AnnotationStyle, MOTION_LABEL};
pub use config::MotionConfig;
pub use control::{
    ControlLoop, ControlSignals, LoopState, ManualSignals, RunSummary, RuntimeSettings, StopFlag,
    StopReason,
};
pub use detect::{
    build_model, erode, extract, select, BackgroundModel, BoundingBox, ModelKind, ModelSettings,
    Point, Region, SelectionParams,
};
pub use display::{CollectingSink, DisplaySink, ImageDirSink, NullSink};
pub use frame::{bgr_to_rgb, frame_from_bgr, frame_from_rgb, Frame, Mask};
pub use ingest::{discover_videos, FileSource, FrameSource, SourceStats};
pub use pipeline::MotionDetector;

// -------------------- Errors --------------------

/// Terminal pipeline failures callers may want to match on.
///
/// Carried through `anyhow::Error`; recover with
/// `err.downcast_ref::<PipelineError>()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineError {
    /// The frame source could not be opened. No frame was processed.
    CannotOpenSource { identifier: String, reason: String },
    /// Reading frame `frame_index` failed. The loop stopped without retrying.
    ReadFailure { frame_index: u64, reason: String },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::CannotOpenSource { .. } => "CANNOT_OPEN_SOURCE",
            PipelineError::ReadFailure { .. } => "READ_FAILURE",
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::CannotOpenSource { identifier, reason } => write!(
                f,
                "{}: cannot open source '{}': {}",
                self.code(),
                identifier,
                reason
            ),
            PipelineError::ReadFailure {
                frame_index,
                reason,
            } => write!(
                f,
                "{}: failed to read frame {}: {}",
                self.code(),
                frame_index,
                reason
            ),
        }
    }
}

impl std::error::Error for PipelineError {}
