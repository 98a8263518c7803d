//! motiond - motion detection over a video file, image directory or synthetic scene
//!
//! This binary:
//! 1. Loads configuration (defaults, `MOTION_CONFIG` / `--config`, env overrides)
//! 2. Opens the frame source
//! 3. Runs the control loop until end of stream, `--max-frames` or Ctrl-C
//! 4. Writes annotated frames as PNG files when `--out` is given

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use motion_sentry::{
    discover_videos, ControlLoop, DisplaySink, Frame, ImageDirSink, MotionConfig, NullSink,
    StopFlag,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Source locator: video file, image directory, single image or stub:// scene.
    #[arg(value_name = "SOURCE", conflicts_with = "source_flag")]
    source: Option<String>,
    /// Source locator (same as the positional argument).
    #[arg(long = "source", value_name = "SOURCE")]
    source_flag: Option<String>,
    /// Configuration file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "MOTION_CONFIG")]
    config: Option<PathBuf>,
    /// Directory for annotated PNG frames. Frames are discarded when omitted.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// List the .mp4 files in a directory and exit.
    #[arg(long, value_name = "DIR")]
    list: Option<PathBuf>,
}

/// Raises the stop flag once `limit` frames have been shown.
struct FrameLimit<D> {
    inner: D,
    limit: Option<u64>,
    shown: u64,
    stop: StopFlag,
}

impl<D: DisplaySink> DisplaySink for FrameLimit<D> {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.inner.show(frame)?;
        self.shown += 1;
        if self.limit.is_some_and(|limit| self.shown >= limit) {
            self.stop.request_stop();
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(dir) = &args.list {
        let videos = discover_videos(dir)?;
        if videos.is_empty() {
            log::warn!("no .mp4 files in {}", dir.display());
        }
        for video in videos {
            println!("{}", video.display());
        }
        return Ok(());
    }

    let mut cfg = MotionConfig::load_from(args.config.as_deref())?;
    if let Some(source) = args.source.or(args.source_flag) {
        cfg.source = source;
        cfg.validate()?;
    }
    if args.max_frames == Some(0) {
        return Err(anyhow!("--max-frames must be greater than zero"));
    }

    log::info!(
        "motiond {} source={} model={:?} history={} warmup={} max_regions={} min_area_fraction={}",
        env!("CARGO_PKG_VERSION"),
        cfg.source,
        cfg.model.kind,
        cfg.model.history_length,
        cfg.selection.warmup_frames,
        cfg.selection.max_regions,
        cfg.selection.min_area_fraction
    );

    let stop = StopFlag::new();
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received, stopping after the current frame...");
        handler_flag.request_stop();
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let control = ControlLoop::open(&cfg, &cfg.source)?;
    let summary = match &args.out {
        Some(dir) => {
            let mut sink = FrameLimit {
                inner: ImageDirSink::create(dir)?,
                limit: args.max_frames,
                shown: 0,
                stop: stop.clone(),
            };
            control.run(&stop, &mut sink)?
        }
        None => {
            let mut sink = FrameLimit {
                inner: NullSink::default(),
                limit: args.max_frames,
                shown: 0,
                stop: stop.clone(),
            };
            control.run(&stop, &mut sink)?
        }
    };

    log::info!(
        "motiond done: {} frames, {} with motion, {} regions ({:?})",
        summary.frames_processed,
        summary.frames_with_motion,
        summary.regions_reported,
        summary.stop_reason
    );
    Ok(())
}
