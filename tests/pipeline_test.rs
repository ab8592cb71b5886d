//! End-to-end runs of the capture loop over scripted frames

use image::{Rgb, RgbImage};
use motioncam::annotate::Annotator;
use motioncam::capture::FrameSequence;
use motioncam::config::Config;
use motioncam::display::{DisplayControl, DisplaySink};
use motioncam::pipeline::{run_pipeline, MotionSession, PipelineOptions};
use motioncam::upload::{DirectoryStore, ObjectStore, Uploader};
use motioncam::{Error, Result};
use tempfile::TempDir;

const WIDTH: u32 = 500;
const HEIGHT: u32 = 200;

fn scenario_config() -> Config {
    Config::from_json(
        r#"{
            "use_dropbox": false,
            "dropbox_key": "",
            "dropbox_secret": "",
            "dropbox_base_path": "/motion",
            "resolution": [500, 200],
            "fps": 1000,
            "camera_warmup_time": 0,
            "delta_thresh": 25,
            "min_area": 500,
            "min_upload_seconds": 30,
            "min_motion_frames": 8,
            "show_video": false
        }"#,
    )
    .unwrap()
}

/// Black frame with a white 30x30 square whose left edge is at `x`
fn frame_with_square(x: u32) -> RgbImage {
    let mut frame = RgbImage::new(WIDTH, HEIGHT);
    for yy in 85..115 {
        for xx in x..x + 30 {
            frame.put_pixel(xx, yy, Rgb([255, 255, 255]));
        }
    }
    frame
}

/// One empty warm-up frame, then `count` frames with a square moving right
fn moving_square_frames(count: u32) -> Vec<RgbImage> {
    let mut frames = vec![RgbImage::new(WIDTH, HEIGHT)];
    frames.extend((0..count).map(|i| frame_with_square(10 + i * 45)));
    frames
}

struct FailingStore;

impl ObjectStore for FailingStore {
    fn put_file(&mut self, _path: &str, _bytes: &[u8]) -> Result<()> {
        Err(Error::Upload("network unreachable".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Display that asks to quit after a fixed number of frames
struct QuitAfter {
    remaining: usize,
    shown: usize,
}

impl DisplaySink for QuitAfter {
    fn show(&mut self, _frame: &RgbImage) -> Result<DisplayControl> {
        self.shown += 1;
        if self.shown >= self.remaining {
            Ok(DisplayControl::Quit)
        } else {
            Ok(DisplayControl::Continue)
        }
    }
}

#[test]
fn test_single_confirmation_without_upload() {
    let config = scenario_config();
    let mut capture = FrameSequence::new(moving_square_frames(10));
    let mut session = MotionSession::from_config(&config);

    let summary = run_pipeline(
        &mut capture,
        &mut session,
        &Annotator::default(),
        None,
        None::<&mut dyn DisplaySink>,
        &PipelineOptions::from_config(&config),
    )
    .unwrap();

    assert_eq!(summary.frames, 11);
    assert_eq!(summary.motion_events, 1);
    assert_eq!(summary.uploads, 0);
    assert!(!summary.quit_requested);
    assert!(session.debouncer().last_uploaded_at().is_some());
}

#[test]
fn test_confirmation_lands_on_eighth_motion_frame() {
    let config = scenario_config();
    let mut session = MotionSession::from_config(&config);
    let start = chrono::Local::now();

    let confirmed_at: Vec<usize> = moving_square_frames(10)
        .iter()
        .enumerate()
        .filter_map(|(index, frame)| {
            let timestamp = start + chrono::TimeDelta::milliseconds(index as i64 * 100);
            let report = session.process(frame, timestamp).unwrap();
            report.event.map(|_| index)
        })
        .collect();

    // Index 0 is the warm-up frame, so the 8th motion frame is index 8
    assert_eq!(confirmed_at, vec![8]);
}

#[test]
fn test_confirmed_frame_is_stored() {
    let config = scenario_config();
    let store_dir = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let mut uploader = Uploader::new(
        Box::new(DirectoryStore::new(store_dir.path())),
        config.dropbox_base_path.clone(),
        Some(temp_dir.path().to_path_buf()),
    );

    let mut capture = FrameSequence::new(moving_square_frames(10));
    let mut session = MotionSession::from_config(&config);

    let summary = run_pipeline(
        &mut capture,
        &mut session,
        &Annotator::default(),
        Some(&mut uploader),
        None::<&mut dyn DisplaySink>,
        &PipelineOptions::from_config(&config),
    )
    .unwrap();

    assert_eq!(summary.uploads, 1);

    let stored: Vec<_> = std::fs::read_dir(store_dir.path().join("motion"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].extension().and_then(|e| e.to_str()), Some("jpg"));

    let decoded = image::open(&stored[0]).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));

    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_failed_upload_does_not_stop_the_loop() {
    let mut config = scenario_config();
    config.min_motion_frames = 2;
    config.min_upload_seconds = 0.0;

    let mut uploader = Uploader::new(Box::new(FailingStore), "/motion", None);
    let mut capture = FrameSequence::new(moving_square_frames(8));
    let mut session = MotionSession::from_config(&config);

    let summary = run_pipeline(
        &mut capture,
        &mut session,
        &Annotator::default(),
        Some(&mut uploader),
        None::<&mut dyn DisplaySink>,
        &PipelineOptions::from_config(&config),
    )
    .unwrap();

    assert_eq!(summary.frames, 9);
    assert_eq!(summary.motion_events, 4);
    assert_eq!(summary.failed_uploads, 4);
    assert_eq!(summary.uploads, 0);
}

#[test]
fn test_display_quit_stops_the_loop() {
    let config = scenario_config();
    let mut capture = FrameSequence::new(moving_square_frames(10));
    let mut session = MotionSession::from_config(&config);
    let mut display = QuitAfter {
        remaining: 3,
        shown: 0,
    };

    let summary = run_pipeline(
        &mut capture,
        &mut session,
        &Annotator::default(),
        None,
        Some(&mut display),
        &PipelineOptions::from_config(&config),
    )
    .unwrap();

    // Warm-up frame is never displayed
    assert!(summary.quit_requested);
    assert_eq!(display.shown, 3);
    assert_eq!(summary.frames, 4);
    assert_eq!(capture.remaining(), 7);
}

#[test]
fn test_frames_are_resized_before_detection() {
    let mut config = scenario_config();
    config.resize_width = 250;

    let mut capture = FrameSequence::new(moving_square_frames(2));
    let mut session = MotionSession::from_config(&config);

    run_pipeline(
        &mut capture,
        &mut session,
        &Annotator::default(),
        None,
        None::<&mut dyn DisplaySink>,
        &PipelineOptions::from_config(&config),
    )
    .unwrap();

    let average = session.background().average().unwrap();
    assert_eq!(average.dim(), (100, 250));
}
