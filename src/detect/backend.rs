use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::str::FromStr;

use crate::frame::{Frame, Mask};

use super::backends::{KnnModel, RunningAverageModel};

/// Background model implementations selectable from configuration.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Per-pixel sample set, nearest-neighbour vote.
    #[default]
    Knn,
    /// Per-pixel exponential running mean with a fixed difference threshold.
    RunningAverage,
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "knn" => Ok(Self::Knn),
            "running_average" | "running-average" => Ok(Self::RunningAverage),
            other => Err(anyhow!("unknown background model '{}'", other)),
        }
    }
}

/// Tunables for the background model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSettings {
    pub kind: ModelKind,
    /// Number of frames over which the adaptation rate decays to its floor.
    pub history_length: u32,
    /// Samples kept per pixel by the KNN model.
    pub samples: usize,
    /// Matching samples required to call a pixel background.
    pub knn_matches: usize,
    /// Squared RGB distance under which a sample matches.
    pub dist2_threshold: f32,
    /// Summed absolute channel difference that marks foreground for the running average.
    pub running_average_threshold: u32,
    /// Seed for sample replacement. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            kind: ModelKind::Knn,
            history_length: 1500,
            samples: 7,
            knn_matches: 3,
            dist2_threshold: 400.0,
            running_average_threshold: 50,
            seed: None,
        }
    }
}

/// Background model trait.
///
/// A model owns per-pixel state for exactly one stream. `apply` must be called
/// once per frame, in frame order, including frames that are never displayed.
/// There is no reset: a new stream gets a new model.
pub trait BackgroundModel: Send {
    /// Model identifier.
    fn name(&self) -> &'static str;

    /// Classify every pixel of `frame` and fold it into the model.
    fn apply(&mut self, frame: &Frame) -> Result<Mask>;

    /// Frames observed so far.
    fn frames_seen(&self) -> u64;
}

/// Adaptation rate after `frames_seen` frames: `1 / min(2n, history)`.
///
/// Decreases monotonically with `frames_seen` and never drops below `1 / history`.
pub fn learning_rate(frames_seen: u64, history_length: u32) -> f32 {
    let window = frames_seen
        .saturating_mul(2)
        .min(history_length as u64)
        .max(1);
    1.0 / window as f32
}

/// Construct the configured model.
pub fn build_model(settings: &ModelSettings) -> Box<dyn BackgroundModel> {
    match settings.kind {
        ModelKind::Knn => Box::new(KnnModel::new(settings)),
        ModelKind::RunningAverage => Box::new(RunningAverageModel::new(settings)),
    }
}

pub(crate) fn check_dimensions(name: &str, expected: (u32, u32), frame: &Frame) -> Result<()> {
    if frame.dimensions() != expected {
        return Err(anyhow!(
            "{} model expects {}x{} frames, got {}x{}",
            name,
            expected.0,
            expected.1,
            frame.width(),
            frame.height()
        ));
    }
    Ok(())
}
