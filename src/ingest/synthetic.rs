//! Synthetic (`stub://`) scenes for tests and demos.
//!
//! Locator format: `stub://<scene>[?key=value&...]` with keys
//! `width`, `height`, `frames`, `start`, `size`, `step`, `seed`, `fail_at`.
//!
//! Scenes:
//! - `static`: background gradient only
//! - `square`: gradient plus a `size`×`size` square appearing at frame `start`
//!   in the centre of the frame and staying put
//! - `moving`: like `square`, but the square moves `step` pixels right per frame
//! - `noise`: gradient with per-pixel jitter of at most ±`size` levels
//!
//! `fail_at=N` makes frame N fail to read, to exercise read-failure handling.

use anyhow::{anyhow, bail, Result};
use image::Rgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const SQUARE_COLOR: Rgb<u8> = Rgb([240, 32, 255]);
const BACKGROUND_BLUE: u8 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticScene {
    Static,
    Square,
    Moving,
    Noise,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SyntheticConfig {
    pub scene: SyntheticScene,
    pub width: u32,
    pub height: u32,
    pub frames: u64,
    pub start: u64,
    pub size: u32,
    pub step: u32,
    pub seed: u64,
    pub fail_at: Option<u64>,
}

impl SyntheticConfig {
    pub(crate) fn parse(locator: &str) -> Result<Self> {
        let rest = locator
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic locator must start with stub://"))?;
        let (scene, query) = rest.split_once('?').unwrap_or((rest, ""));
        let scene = match scene.trim_end_matches('/') {
            "" | "static" => SyntheticScene::Static,
            "square" => SyntheticScene::Square,
            "moving" => SyntheticScene::Moving,
            "noise" => SyntheticScene::Noise,
            other => bail!("unknown synthetic scene '{}'", other),
        };

        let mut cfg = Self {
            scene,
            width: 640,
            height: 360,
            frames: 30,
            start: 6,
            size: 100,
            step: 4,
            seed: 0,
            fail_at: None,
        };
        if scene == SyntheticScene::Noise {
            cfg.size = 4;
        }

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
            let number: u64 = value
                .parse()
                .map_err(|_| anyhow!("stub parameter '{}' must be an integer", key))?;
            match key {
                "width" => cfg.width = number as u32,
                "height" => cfg.height = number as u32,
                "frames" => cfg.frames = number,
                "start" => cfg.start = number,
                "size" => cfg.size = number as u32,
                "step" => cfg.step = number as u32,
                "seed" => cfg.seed = number,
                "fail_at" => cfg.fail_at = Some(number),
                other => bail!("unknown stub parameter '{}'", other),
            }
        }
        if cfg.width == 0 || cfg.height == 0 {
            bail!("synthetic frame dimensions must be non-zero");
        }
        Ok(cfg)
    }
}

pub(crate) struct SyntheticSource {
    locator: String,
    config: SyntheticConfig,
    frame_count: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub(crate) fn new(locator: &str, config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            locator: locator.to_string(),
            config,
            frame_count: 0,
            rng,
        }
    }

    fn render(&mut self, index: u64) -> Frame {
        let cfg = &self.config;
        let (w, h) = (cfg.width, cfg.height);
        let mut frame = Frame::from_fn(w, h, |x, y| {
            Rgb([
                (x as u64 * 255 / w as u64) as u8,
                (y as u64 * 255 / h as u64) as u8,
                BACKGROUND_BLUE,
            ])
        });

        match cfg.scene {
            SyntheticScene::Static => {}
            SyntheticScene::Square | SyntheticScene::Moving if index >= cfg.start => {
                let offset = if cfg.scene == SyntheticScene::Moving {
                    (index - cfg.start) * cfg.step as u64
                } else {
                    0
                };
                let x0 = (w.saturating_sub(cfg.size) / 2) as u64 + offset;
                let y0 = h.saturating_sub(cfg.size) / 2;
                for y in y0..(y0 + cfg.size).min(h) {
                    for x in x0..(x0 + cfg.size as u64).min(w as u64) {
                        frame.put_pixel(x as u32, y, SQUARE_COLOR);
                    }
                }
            }
            SyntheticScene::Square | SyntheticScene::Moving => {}
            SyntheticScene::Noise => {
                let amplitude = cfg.size.min(127) as i16;
                for px in frame.pixels_mut() {
                    for channel in px.0.iter_mut() {
                        let jitter = self.rng.gen_range(-amplitude..=amplitude);
                        *channel = (*channel as i16 + jitter).clamp(0, 255) as u8;
                    }
                }
            }
        }
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.config.frames {
            return Ok(None);
        }
        let index = self.frame_count + 1;
        if self.config.fail_at == Some(index) {
            bail!("synthetic read failure at frame {}", index);
        }
        self.frame_count = index;
        Ok(Some(self.render(index)))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            locator: self.locator.clone(),
        }
    }
}
