use anyhow::Result;
use image::{Luma, Rgb};

use motion_sentry::{
    AnnotationStyle, BackgroundModel, CollectingSink, ControlLoop, FileSource, Frame,
    FrameSource, ImageDirSink, Mask, ModelSettings, MotionConfig, MotionDetector, PipelineError,
    SelectionParams, StopFlag, StopReason,
};

const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GREY: Rgb<u8> = Rgb([90, 90, 90]);

fn seeded_config() -> MotionConfig {
    let mut config = MotionConfig::default();
    config.model = ModelSettings {
        seed: Some(7),
        ..ModelSettings::default()
    };
    config
}

/// Run the detector directly over a source, returning the regions per frame.
fn region_counts(locator: &str, config: &MotionConfig) -> Result<Vec<usize>> {
    let mut source = FileSource::open(locator)?;
    let mut detector = MotionDetector::new(config);
    let mut counts = Vec::new();
    let mut index = 0;
    while let Some(mut frame) = source.next_frame()? {
        index += 1;
        counts.push(detector.process(&mut frame, index)?.len());
    }
    Ok(counts)
}

#[test]
fn square_is_detected_after_warmup_at_full_resolution() -> Result<()> {
    let config = seeded_config();
    let mut source = FileSource::open("stub://square?frames=6")?;
    let mut detector = MotionDetector::new(&config);

    for index in 1..=5 {
        let mut frame = source.next_frame()?.expect("warm-up frame");
        let original = frame.clone();
        assert!(detector.process(&mut frame, index)?.is_empty());
        assert_eq!(frame, original, "frame {} must be delivered unmodified", index);
    }

    let mut frame = source.next_frame()?.expect("frame 6");
    assert_eq!(frame.dimensions(), (640, 360));
    let regions = detector.process(&mut frame, 6)?;
    assert_eq!(regions.len(), 1);

    // 100x100 square at (270, 130), shrunk by one pixel per side.
    let region = &regions[0];
    assert_eq!(region.area, 98 * 98);
    assert!(region.area_fraction(640 * 360) > 0.01);
    let bbox = region.bounding_box;
    assert_eq!((bbox.x1(), bbox.y1(), bbox.x2(), bbox.y2()), (271, 131, 369, 229));

    assert_eq!(frame.get_pixel(271, 131), &YELLOW);
    assert_eq!(frame.get_pixel(369, 229), &YELLOW);
    assert_eq!(frame.get_pixel(0, 0), &WHITE);
    assert_eq!(frame.get_pixel(320, 28), &WHITE);
    assert_ne!(frame.get_pixel(321, 0), &WHITE);
    assert_ne!(frame.get_pixel(0, 29), &WHITE);
    Ok(())
}

#[test]
fn static_square_is_absorbed_into_background() -> Result<()> {
    let counts = region_counts("stub://square?frames=30", &seeded_config())?;
    assert_eq!(counts.len(), 30);
    assert!(counts[..5].iter().all(|&n| n == 0));
    // Frames 6-8: the square holds at most two of the seven samples.
    assert_eq!(counts[5..8], [1, 1, 1]);
    // Blind replacement at rate 7/16 fragments it below the area floor at once.
    assert!(counts[8..].iter().all(|&n| n == 0), "counts: {:?}", counts);
    Ok(())
}

fn history_config(history_length: u32) -> MotionConfig {
    let mut config = seeded_config();
    config.model.history_length = history_length;
    config
}

#[test]
fn late_arrival_absorption_follows_the_history_length() -> Result<()> {
    // The square appears on frame 61, long after the sample set filled up.
    let locator = "stub://square?width=160&height=90&size=30&start=61&frames=100";

    // Decaying rate: about 7/122 per frame, so the square stays foreground.
    let long = region_counts(locator, &history_config(1500))?;
    assert!(long[..60].iter().all(|&n| n == 0));
    assert!(long[60..72].iter().all(|&n| n == 1), "counts: {:?}", long);

    // Rate floored at 1/8: replacement is near certain and absorption is quick.
    let short = region_counts(locator, &history_config(8))?;
    assert!(short[..60].iter().all(|&n| n == 0));
    assert_eq!(short[60], 1);
    assert!(short[75..].iter().all(|&n| n == 0), "counts: {:?}", short);
    Ok(())
}

#[test]
fn moving_square_keeps_being_detected() -> Result<()> {
    let counts = region_counts(
        "stub://moving?width=160&height=90&size=30&step=4&frames=20",
        &seeded_config(),
    )?;
    assert!(counts[..5].iter().all(|&n| n == 0));
    assert!(counts[5..].iter().all(|&n| n >= 1), "counts: {:?}", counts);
    Ok(())
}

#[test]
fn sensor_noise_is_not_reported() -> Result<()> {
    let counts = region_counts(
        "stub://noise?width=96&height=64&size=3&frames=20",
        &seeded_config(),
    )?;
    assert!(counts.iter().all(|&n| n == 0), "counts: {:?}", counts);
    Ok(())
}

/// Replays one mask for every frame.
struct FixedMask(Mask);

impl BackgroundModel for FixedMask {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn apply(&mut self, _frame: &Frame) -> Result<Mask> {
        Ok(self.0.clone())
    }

    fn frames_seen(&self) -> u64 {
        0
    }
}

#[test]
fn only_the_three_largest_regions_are_annotated() -> Result<()> {
    // (x, side): eroded areas 784, 576, 400, 256, 225 in a 20000 px frame.
    let squares = [(5u32, 30u32), (45, 26), (80, 22), (112, 18), (140, 17)];
    let mask = Mask::from_fn(200, 100, |x, y| {
        let inside = squares
            .iter()
            .any(|&(x0, side)| (x0..x0 + side).contains(&x) && (40..40 + side).contains(&y));
        Luma([if inside { 255 } else { 0 }])
    });
    let mut detector = MotionDetector::with_model(
        Box::new(FixedMask(mask)),
        3,
        SelectionParams::default(),
        AnnotationStyle::default(),
    );

    let mut frame = Frame::new(200, 100);
    let regions = detector.process(&mut frame, 10)?;
    let areas: Vec<u64> = regions.iter().map(|r| r.area).collect();
    assert_eq!(areas, vec![784, 576, 400]);

    for &(x0, _) in &squares[..3] {
        assert_eq!(frame.get_pixel(x0 + 1, 41), &YELLOW);
    }
    for &(x0, _) in &squares[3..] {
        assert_eq!(frame.get_pixel(x0 + 1, 41), &Rgb([0, 0, 0]));
    }
    Ok(())
}

#[test]
fn unopenable_source_never_reaches_the_sink() {
    let config = MotionConfig::default();
    for locator in ["/no/such/video.mp4", "rtsp://camera-1/stream", ""] {
        let err = ControlLoop::open(&config, locator)
            .err()
            .expect("open must fail");
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::CannotOpenSource { identifier, .. }) => {
                assert_eq!(identifier, locator)
            }
            other => panic!("unexpected error for {:?}: {:?}", locator, other),
        }
    }
}

#[test]
fn read_failure_stops_the_loop() -> Result<()> {
    let mut sink = CollectingSink::default();
    let err = ControlLoop::open(
        &MotionConfig::default(),
        "stub://static?width=32&height=24&fail_at=4",
    )?
    .run(&StopFlag::new(), &mut sink)
    .expect_err("read failure");

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::ReadFailure { frame_index, reason }) => {
            assert_eq!(*frame_index, 4);
            assert!(reason.contains("synthetic read failure"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(sink.frames.len(), 3);
    Ok(())
}

#[test]
fn stop_before_start_processes_nothing() -> Result<()> {
    let flag = StopFlag::new();
    flag.request_stop();
    let mut sink = CollectingSink::default();
    let summary = ControlLoop::open(&MotionConfig::default(), "stub://square")?
        .run(&flag, &mut sink)?;
    assert_eq!(summary.stop_reason, StopReason::StopRequested);
    assert_eq!(summary.frames_processed, 0);
    assert!(sink.frames.is_empty());
    Ok(())
}

#[test]
fn static_stream_is_delivered_unmodified() -> Result<()> {
    let mut sink = CollectingSink::default();
    let summary = ControlLoop::open(
        &seeded_config(),
        "stub://static?width=64&height=48&frames=12",
    )?
    .run(&StopFlag::new(), &mut sink)?;

    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    assert_eq!(summary.frames_processed, 12);
    assert_eq!(summary.frames_with_motion, 0);
    assert_eq!(sink.frames.len(), 12);
    assert!(sink.frames.iter().all(|frame| *frame == sink.frames[0]));
    Ok(())
}

fn write_frame(dir: &std::path::Path, index: u32, with_square: bool) -> Result<()> {
    let frame = Frame::from_fn(64, 48, |x, y| {
        if with_square && (24..40).contains(&x) && (16..32).contains(&y) {
            Rgb([255, 0, 255])
        } else {
            GREY
        }
    });
    frame.save(dir.join(format!("input_{:03}.png", index)))?;
    Ok(())
}

#[test]
fn image_directory_round_trip() -> Result<()> {
    let input = tempfile::tempdir()?;
    for index in 1..=8 {
        write_frame(input.path(), index, index >= 6)?;
    }
    let output = tempfile::tempdir()?;
    let out_dir = output.path().join("annotated");

    let locator = input.path().display().to_string();
    let mut sink = ImageDirSink::create(&out_dir)?;
    let summary = ControlLoop::open(&seeded_config(), &locator)?.run(&StopFlag::new(), &mut sink)?;

    assert_eq!(summary.frames_processed, 8);
    assert!(summary.frames_with_motion >= 1);
    assert_eq!(sink.frames_written(), 8);

    let before = image::open(out_dir.join("frame_000005.png"))?.to_rgb8();
    assert_eq!(before.get_pixel(25, 17), &GREY);
    assert_eq!(before.get_pixel(0, 0), &GREY);

    let first_motion = image::open(out_dir.join("frame_000006.png"))?.to_rgb8();
    assert_eq!(first_motion.get_pixel(25, 17), &YELLOW);
    assert_eq!(first_motion.get_pixel(0, 0), &WHITE);
    Ok(())
}

#[test]
fn frame_size_change_is_a_read_failure() -> Result<()> {
    let input = tempfile::tempdir()?;
    Frame::from_pixel(32, 32, GREY).save(input.path().join("a.png"))?;
    Frame::from_pixel(48, 32, GREY).save(input.path().join("b.png"))?;

    let mut sink = CollectingSink::default();
    let locator = input.path().display().to_string();
    let err = ControlLoop::open(&MotionConfig::default(), &locator)?
        .run(&StopFlag::new(), &mut sink)
        .expect_err("size change");
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ReadFailure { frame_index: 2, .. })
    ));
    assert_eq!(sink.frames.len(), 1);
    Ok(())
}
