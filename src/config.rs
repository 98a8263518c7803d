use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::annotate::AnnotationStyle;
use crate::control::RuntimeSettings;
use crate::detect::{ModelKind, ModelSettings, SelectionParams};
use crate::frame::Color;

const DEFAULT_SOURCE: &str = "stub://square";
const DEFAULT_EROSION_KERNEL_SIZE: u32 = 3;

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    source: Option<String>,
    model: Option<ModelConfigFile>,
    filter: Option<FilterConfigFile>,
    annotation: Option<AnnotationConfigFile>,
    runtime: Option<RuntimeConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    kind: Option<ModelKind>,
    history_length: Option<u32>,
    samples: Option<usize>,
    knn_matches: Option<usize>,
    dist2_threshold: Option<f32>,
    running_average_threshold: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct FilterConfigFile {
    erosion_kernel_size: Option<u32>,
    max_regions: Option<usize>,
    warmup_frames: Option<u64>,
    min_area_fraction: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnotationConfigFile {
    highlight_color: Option<Color>,
    outline_thickness: Option<u32>,
    banner_fill_color: Option<Color>,
    banner_text_color: Option<Color>,
    banner_height_fraction: Option<f64>,
    banner_text_offset: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RuntimeConfigFile {
    idle_poll_ms: Option<u64>,
    health_log_secs: Option<u64>,
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    /// Frame source identifier (file path, image directory or `stub://` locator).
    pub source: String,
    pub model: ModelSettings,
    pub erosion_kernel_size: u32,
    pub selection: SelectionParams,
    pub style: AnnotationStyle,
    pub runtime: RuntimeSettings,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            model: ModelSettings::default(),
            erosion_kernel_size: DEFAULT_EROSION_KERNEL_SIZE,
            selection: SelectionParams::default(),
            style: AnnotationStyle::default(),
            runtime: RuntimeSettings::default(),
        }
    }
}

impl MotionConfig {
    /// Defaults, then the file named by `MOTION_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTION_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like `load`, with an explicit config file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => MotionConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MotionConfigFile) -> Self {
        let defaults = Self::default();
        let model = file.model.unwrap_or_default();
        let filter = file.filter.unwrap_or_default();
        let annotation = file.annotation.unwrap_or_default();
        let runtime = file.runtime.unwrap_or_default();

        Self {
            source: file.source.unwrap_or(defaults.source),
            model: ModelSettings {
                kind: model.kind.unwrap_or(defaults.model.kind),
                history_length: model
                    .history_length
                    .unwrap_or(defaults.model.history_length),
                samples: model.samples.unwrap_or(defaults.model.samples),
                knn_matches: model.knn_matches.unwrap_or(defaults.model.knn_matches),
                dist2_threshold: model
                    .dist2_threshold
                    .unwrap_or(defaults.model.dist2_threshold),
                running_average_threshold: model
                    .running_average_threshold
                    .unwrap_or(defaults.model.running_average_threshold),
                seed: model.seed.or(defaults.model.seed),
            },
            erosion_kernel_size: filter
                .erosion_kernel_size
                .unwrap_or(defaults.erosion_kernel_size),
            selection: SelectionParams {
                warmup_frames: filter
                    .warmup_frames
                    .unwrap_or(defaults.selection.warmup_frames),
                max_regions: filter
                    .max_regions
                    .unwrap_or(defaults.selection.max_regions),
                min_area_fraction: filter
                    .min_area_fraction
                    .unwrap_or(defaults.selection.min_area_fraction),
            },
            style: AnnotationStyle {
                highlight_color: annotation
                    .highlight_color
                    .unwrap_or(defaults.style.highlight_color),
                outline_thickness: annotation
                    .outline_thickness
                    .unwrap_or(defaults.style.outline_thickness),
                banner_fill_color: annotation
                    .banner_fill_color
                    .unwrap_or(defaults.style.banner_fill_color),
                banner_text_color: annotation
                    .banner_text_color
                    .unwrap_or(defaults.style.banner_text_color),
                banner_height_fraction: annotation
                    .banner_height_fraction
                    .unwrap_or(defaults.style.banner_height_fraction),
                banner_text_offset: annotation
                    .banner_text_offset
                    .unwrap_or(defaults.style.banner_text_offset),
            },
            runtime: RuntimeSettings {
                idle_poll: runtime
                    .idle_poll_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.runtime.idle_poll),
                health_log_interval: runtime
                    .health_log_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.runtime.health_log_interval),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("MOTION_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Some(kind) = env_parse::<ModelKind>("MOTION_MODEL")? {
            self.model.kind = kind;
        }
        if let Some(history) = env_parse("MOTION_HISTORY_LENGTH")? {
            self.model.history_length = history;
        }
        if let Some(seed) = env_parse("MOTION_SEED")? {
            self.model.seed = Some(seed);
        }
        if let Some(warmup) = env_parse("MOTION_WARMUP_FRAMES")? {
            self.selection.warmup_frames = warmup;
        }
        if let Some(max_regions) = env_parse("MOTION_MAX_REGIONS")? {
            self.selection.max_regions = max_regions;
        }
        if let Some(fraction) = env_parse("MOTION_MIN_AREA_FRACTION")? {
            self.selection.min_area_fraction = fraction;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("source must not be empty"));
        }
        if self.model.history_length == 0 {
            return Err(anyhow!("history_length must be greater than zero"));
        }
        if self.model.samples == 0 {
            return Err(anyhow!("samples must be greater than zero"));
        }
        if self.model.knn_matches == 0 || self.model.knn_matches > self.model.samples {
            return Err(anyhow!(
                "knn_matches must be between 1 and samples ({})",
                self.model.samples
            ));
        }
        if !(self.model.dist2_threshold > 0.0) {
            return Err(anyhow!("dist2_threshold must be positive"));
        }
        if self.erosion_kernel_size == 0 || self.erosion_kernel_size % 2 == 0 {
            return Err(anyhow!(
                "erosion_kernel_size must be odd and positive, got {}",
                self.erosion_kernel_size
            ));
        }
        if self.selection.max_regions == 0 {
            return Err(anyhow!("max_regions must be greater than zero"));
        }
        if !(0.0..1.0).contains(&self.selection.min_area_fraction) {
            return Err(anyhow!("min_area_fraction must be within [0, 1)"));
        }
        if !(self.style.banner_height_fraction > 0.0 && self.style.banner_height_fraction <= 1.0)
        {
            return Err(anyhow!("banner_height_fraction must be within (0, 1]"));
        }
        if self.style.outline_thickness == 0 {
            return Err(anyhow!("outline_thickness must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MotionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{} is invalid: {}", key, e)),
        _ => Ok(None),
    }
}
