//! Control loop: `Idle → Running → Stopped`.
//!
//! The loop owns the frame source, the frame counter and the per-run
//! `MotionDetector`. Start and stop are cooperative: signals are polled, and a
//! stop request takes effect only after the current frame has been processed
//! and delivered to the sink. A stopped loop is consumed; retrying a source
//! means opening a fresh `ControlLoop`.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::MotionConfig;
use crate::display::DisplaySink;
use crate::ingest::{FileSource, FrameSource};
use crate::pipeline::MotionDetector;
use crate::PipelineError;

const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(50);
const DEFAULT_HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Loop timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Sleep between start-signal polls while idle.
    pub idle_poll: Duration,
    /// Interval between source health log lines while running.
    pub health_log_interval: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            idle_poll: DEFAULT_IDLE_POLL,
            health_log_interval: DEFAULT_HEALTH_LOG_INTERVAL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

impl LoopState {
    /// `Stopped` is terminal; `Idle` may stop without ever running.
    pub fn can_transition(self, next: LoopState) -> bool {
        matches!(
            (self, next),
            (LoopState::Idle, LoopState::Running)
                | (LoopState::Idle, LoopState::Stopped)
                | (LoopState::Running, LoopState::Stopped)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    StopRequested,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_with_motion: u64,
    pub regions_reported: u64,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn new(stop_reason: StopReason) -> Self {
        Self {
            frames_processed: 0,
            frames_with_motion: 0,
            regions_reported: 0,
            stop_reason,
        }
    }
}

/// External start/stop signals, polled by the loop.
pub trait ControlSignals {
    fn start_requested(&self) -> bool;
    fn stop_requested(&self) -> bool;
}

impl<C: ControlSignals + ?Sized> ControlSignals for &C {
    fn start_requested(&self) -> bool {
        (**self).start_requested()
    }

    fn stop_requested(&self) -> bool {
        (**self).stop_requested()
    }
}

/// Start immediately, stop when flagged.
///
/// Clones share the flag, so a clone can be moved into a Ctrl-C handler or
/// another thread.
#[derive(Clone, Debug, Default)]
pub struct StopFlag {
    stop: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl ControlSignals for StopFlag {
    fn start_requested(&self) -> bool {
        true
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Independent start and stop switches.
#[derive(Clone, Debug, Default)]
pub struct ManualSignals {
    start: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl ManualSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_start(&self) {
        self.start.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl ControlSignals for ManualSignals {
    fn start_requested(&self) -> bool {
        self.start.load(Ordering::SeqCst)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

pub struct ControlLoop<S: FrameSource = FileSource> {
    identifier: String,
    source: S,
    detector: MotionDetector,
    runtime: RuntimeSettings,
    state: LoopState,
}

impl ControlLoop<FileSource> {
    /// Open `identifier` and build a fresh detector from `config`.
    ///
    /// Fails with `PipelineError::CannotOpenSource` before any frame is read.
    pub fn open(config: &MotionConfig, identifier: &str) -> Result<Self> {
        let source = FileSource::open(identifier)?;
        Ok(Self::with_source(config, identifier, source))
    }
}

impl<S: FrameSource> ControlLoop<S> {
    /// Drive an already opened source.
    pub fn with_source(config: &MotionConfig, identifier: &str, source: S) -> Self {
        Self {
            identifier: identifier.to_string(),
            source,
            detector: MotionDetector::new(config),
            runtime: config.runtime.clone(),
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Wait for start, process frames until end of stream or a stop request,
    /// then close the source.
    ///
    /// Read failures surface as `PipelineError::ReadFailure` and sink errors are
    /// propagated unchanged; the source is closed first in both cases.
    pub fn run<C, D>(mut self, signals: &C, sink: &mut D) -> Result<RunSummary>
    where
        C: ControlSignals + ?Sized,
        D: DisplaySink + ?Sized,
    {
        log::info!("control loop idle: {}", self.identifier);
        loop {
            if signals.stop_requested() {
                self.stop();
                log::info!("stop requested before start, no frames processed");
                return Ok(RunSummary::new(StopReason::StopRequested));
            }
            if signals.start_requested() {
                break;
            }
            std::thread::sleep(self.runtime.idle_poll);
        }

        self.transition(LoopState::Running);
        let mut summary = RunSummary::new(StopReason::EndOfStream);
        let outcome = self.drive(signals, sink, &mut summary);
        self.stop();

        match outcome {
            Ok(reason) => {
                summary.stop_reason = reason;
                log::info!(
                    "control loop stopped ({:?}): frames={} with_motion={} regions={}",
                    reason,
                    summary.frames_processed,
                    summary.frames_with_motion,
                    summary.regions_reported
                );
                Ok(summary)
            }
            Err(e) => {
                log::error!(
                    "control loop failed after {} frames: {:#}",
                    summary.frames_processed,
                    e
                );
                Err(e)
            }
        }
    }

    fn drive<C, D>(
        &mut self,
        signals: &C,
        sink: &mut D,
        summary: &mut RunSummary,
    ) -> Result<StopReason>
    where
        C: ControlSignals + ?Sized,
        D: DisplaySink + ?Sized,
    {
        let mut dimensions = None;
        let mut last_health_log = Instant::now();

        loop {
            let frame_index = summary.frames_processed + 1;
            let mut frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(StopReason::EndOfStream),
                Err(e) => {
                    return Err(PipelineError::ReadFailure {
                        frame_index,
                        reason: format!("{:#}", e),
                    }
                    .into())
                }
            };

            let expected = *dimensions.get_or_insert(frame.dimensions());
            if frame.dimensions() != expected {
                return Err(PipelineError::ReadFailure {
                    frame_index,
                    reason: format!(
                        "frame is {}x{}, stream is {}x{}",
                        frame.width(),
                        frame.height(),
                        expected.0,
                        expected.1
                    ),
                }
                .into());
            }

            summary.frames_processed = frame_index;
            let regions = self.detector.process(&mut frame, frame_index)?;
            if !regions.is_empty() {
                summary.frames_with_motion += 1;
                summary.regions_reported += regions.len() as u64;
            }
            sink.show(&frame)?;

            if last_health_log.elapsed() >= self.runtime.health_log_interval {
                let stats = self.source.stats();
                log::info!(
                    "source health={} frames={} locator={}",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.locator
                );
                last_health_log = Instant::now();
            }

            if signals.stop_requested() {
                return Ok(StopReason::StopRequested);
            }
        }
    }

    fn stop(&mut self) {
        self.transition(LoopState::Stopped);
        self.source.close();
    }

    fn transition(&mut self, next: LoopState) {
        debug_assert!(
            self.state.can_transition(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        log::debug!("control loop {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
