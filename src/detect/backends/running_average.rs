use anyhow::{anyhow, Result};

use crate::detect::backend::{check_dimensions, learning_rate, BackgroundModel, ModelSettings};
use crate::frame::{Frame, Mask, BACKGROUND, FOREGROUND, FOREGROUND_PIXEL};

/// Running-mean background model.
///
/// Cheaper than the KNN model and fine for fixed cameras with stable lighting.
/// The first frame seeds the mean and is reported entirely foreground.
pub struct RunningAverageModel {
    threshold: u32,
    history_length: u32,
    dims: Option<(u32, u32)>,
    mean: Vec<[f32; 3]>,
    frames_seen: u64,
}

impl RunningAverageModel {
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            threshold: settings.running_average_threshold,
            history_length: settings.history_length.max(1),
            dims: None,
            mean: Vec::new(),
            frames_seen: 0,
        }
    }
}

impl BackgroundModel for RunningAverageModel {
    fn name(&self) -> &'static str {
        "running_average"
    }

    fn apply(&mut self, frame: &Frame) -> Result<Mask> {
        self.frames_seen += 1;
        let pixels = frame.as_raw().chunks_exact(3);

        let Some(dims) = self.dims else {
            self.mean = pixels
                .map(|px| [px[0] as f32, px[1] as f32, px[2] as f32])
                .collect();
            self.dims = Some(frame.dimensions());
            return Ok(Mask::from_pixel(
                frame.width(),
                frame.height(),
                FOREGROUND_PIXEL,
            ));
        };
        check_dimensions(self.name(), dims, frame)?;

        let alpha = learning_rate(self.frames_seen, self.history_length);
        let mut mask = Vec::with_capacity(self.mean.len());
        for (mean, px) in self.mean.iter_mut().zip(pixels) {
            let mut diff = 0.0f32;
            for c in 0..3 {
                let value = px[c] as f32;
                diff += (value - mean[c]).abs();
                mean[c] += alpha * (value - mean[c]);
            }
            mask.push(if diff > self.threshold as f32 {
                FOREGROUND
            } else {
                BACKGROUND
            });
        }

        Mask::from_raw(frame.width(), frame.height(), mask)
            .ok_or_else(|| anyhow!("running average mask does not fit frame dimensions"))
    }

    fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::foreground_count;
    use image::Rgb;

    #[test]
    fn flags_large_differences_only() -> Result<()> {
        let mut model = RunningAverageModel::new(&ModelSettings::default());
        let background = Frame::from_pixel(6, 6, Rgb([50, 50, 50]));
        assert_eq!(foreground_count(&model.apply(&background)?), 36);
        assert_eq!(foreground_count(&model.apply(&background)?), 0);

        let mut changed = background.clone();
        changed.put_pixel(0, 0, Rgb([60, 60, 60]));
        changed.put_pixel(3, 3, Rgb([200, 50, 50]));
        let mask = model.apply(&changed)?;
        assert_eq!(foreground_count(&mask), 1);
        assert_eq!(mask.get_pixel(3, 3).0[0], FOREGROUND);
        Ok(())
    }
}
