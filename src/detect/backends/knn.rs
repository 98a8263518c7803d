use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::{check_dimensions, learning_rate, BackgroundModel, ModelSettings};
use crate::frame::{Frame, Mask, BACKGROUND, FOREGROUND};

/// Non-parametric background model.
///
/// Each pixel keeps `samples` recent RGB observations. A pixel is background
/// when at least `knn_matches` of them lie within `dist2_threshold` (squared
/// Euclidean distance) of the new observation. Until the sample set is full the
/// vote only needs as many matches as there are samples; with no samples at all
/// every pixel is foreground.
///
/// The first `samples` frames fill the sample set slot by slot. After that, each
/// pixel replaces one random slot with probability `samples * learning_rate`,
/// so a sample survives on average about `min(2n, history)` frames. Updates are
/// blind: foreground observations are absorbed too, which is what lets a
/// stationary newcomer fade into the background.
pub struct KnnModel {
    samples: usize,
    knn_matches: usize,
    dist2_threshold: f32,
    history_length: u32,
    dims: Option<(u32, u32)>,
    /// Pixel-major: `data[pixel * samples + slot]`.
    data: Vec<[u8; 3]>,
    filled: usize,
    frames_seen: u64,
    rng: StdRng,
}

impl KnnModel {
    pub fn new(settings: &ModelSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            samples: settings.samples.max(1),
            knn_matches: settings.knn_matches.max(1),
            dist2_threshold: settings.dist2_threshold,
            history_length: settings.history_length.max(1),
            dims: None,
            data: Vec::new(),
            filled: 0,
            frames_seen: 0,
            rng,
        }
    }

    fn ensure_allocated(&mut self, frame: &Frame) -> Result<()> {
        match self.dims {
            Some(dims) => check_dimensions(self.name(), dims, frame),
            None => {
                let pixels = frame.width() as usize * frame.height() as usize;
                self.data = vec![[0u8; 3]; pixels * self.samples];
                self.dims = Some(frame.dimensions());
                Ok(())
            }
        }
    }
}

impl BackgroundModel for KnnModel {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn apply(&mut self, frame: &Frame) -> Result<Mask> {
        self.ensure_allocated(frame)?;
        self.frames_seen += 1;

        let filling = self.filled < self.samples;
        let required = self.knn_matches.min(self.filled);
        let replace_probability =
            (self.samples as f32 * learning_rate(self.frames_seen, self.history_length)).min(1.0);

        let mut mask = Vec::with_capacity(frame.as_raw().len() / 3);
        for (pixel, px) in frame.as_raw().chunks_exact(3).enumerate() {
            let observed = [px[0], px[1], px[2]];
            let base = pixel * self.samples;
            let history = &self.data[base..base + self.filled];

            let mut matches = 0;
            if required > 0 {
                for sample in history {
                    if dist2(sample, &observed) < self.dist2_threshold {
                        matches += 1;
                        if matches >= required {
                            break;
                        }
                    }
                }
            }
            mask.push(if required > 0 && matches >= required {
                BACKGROUND
            } else {
                FOREGROUND
            });

            if filling {
                self.data[base + self.filled] = observed;
            } else if self.rng.gen::<f32>() < replace_probability {
                let slot = self.rng.gen_range(0..self.samples);
                self.data[base + slot] = observed;
            }
        }

        if filling {
            self.filled += 1;
        }

        Mask::from_raw(frame.width(), frame.height(), mask)
            .ok_or_else(|| anyhow!("knn mask does not fit frame dimensions"))
    }

    fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

fn dist2(a: &[u8; 3], b: &[u8; 3]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f32 - y as f32;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::foreground_count;
    use image::Rgb;

    fn settings() -> ModelSettings {
        ModelSettings {
            seed: Some(7),
            ..ModelSettings::default()
        }
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> Frame {
        Frame::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn first_frame_is_all_foreground() -> Result<()> {
        let mut model = KnnModel::new(&settings());
        let mask = model.apply(&solid(8, 6, [40, 40, 40]))?;
        assert_eq!(foreground_count(&mask), 48);
        assert_eq!(model.frames_seen(), 1);
        Ok(())
    }

    #[test]
    fn static_scene_settles_to_background() -> Result<()> {
        let mut model = KnnModel::new(&settings());
        let frame = solid(8, 6, [40, 40, 40]);
        model.apply(&frame)?;
        for _ in 0..10 {
            let mask = model.apply(&frame)?;
            assert_eq!(foreground_count(&mask), 0);
        }
        Ok(())
    }

    #[test]
    fn small_sensor_noise_stays_background() -> Result<()> {
        let mut model = KnnModel::new(&settings());
        for _ in 0..8 {
            model.apply(&solid(4, 4, [100, 100, 100]))?;
        }
        // Squared distance 3 * 10^2 = 300 < 400.
        let mask = model.apply(&solid(4, 4, [110, 110, 110]))?;
        assert_eq!(foreground_count(&mask), 0);
        Ok(())
    }

    #[test]
    fn new_object_is_foreground_then_absorbed() -> Result<()> {
        let mut model = KnnModel::new(&ModelSettings {
            history_length: 20,
            ..settings()
        });
        let background = solid(10, 10, [20, 20, 20]);
        for _ in 0..10 {
            model.apply(&background)?;
        }

        let mut with_object = background.clone();
        for y in 2..6 {
            for x in 2..6 {
                with_object.put_pixel(x, y, Rgb([230, 230, 230]));
            }
        }
        let mask = model.apply(&with_object)?;
        assert_eq!(foreground_count(&mask), 16);

        for _ in 0..200 {
            model.apply(&with_object)?;
        }
        assert_eq!(foreground_count(&model.apply(&with_object)?), 0);
        Ok(())
    }

    #[test]
    fn rejects_dimension_change() -> Result<()> {
        let mut model = KnnModel::new(&settings());
        model.apply(&solid(4, 4, [0, 0, 0]))?;
        assert!(model.apply(&solid(5, 4, [0, 0, 0])).is_err());
        Ok(())
    }
}
