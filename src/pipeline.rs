//! The per-frame detection session and the capture loop around it.

use crate::annotate::Annotator;
use crate::capture::CaptureSource;
use crate::config::Config;
use crate::detection::{
    BackgroundModel, BoundingBox, MotionDebouncer, MotionEvent, RegionExtractor, RoomStatus,
};
use crate::display::{DisplayControl, DisplaySink};
use crate::upload::Uploader;
use crate::Result;
use chrono::{DateTime, Local};
use image::{imageops, RgbImage};
use std::time::{Duration, Instant};

/// Outcome of running one frame through the session
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// First frame, used only to seed the background model
    pub warmup: bool,
    pub status: RoomStatus,
    pub regions: Vec<BoundingBox>,
    pub event: Option<MotionEvent>,
}

/// Detection state owned by the capture loop
pub struct MotionSession {
    background: BackgroundModel,
    regions: RegionExtractor,
    debouncer: MotionDebouncer,
}

impl MotionSession {
    pub fn new(
        delta_thresh: u8,
        min_area: f64,
        min_upload_seconds: f64,
        min_motion_frames: u32,
    ) -> Self {
        Self {
            background: BackgroundModel::new(delta_thresh),
            regions: RegionExtractor::new(min_area),
            debouncer: MotionDebouncer::new(min_motion_frames, min_upload_seconds),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.delta_thresh,
            config.min_area,
            config.min_upload_seconds,
            config.min_motion_frames,
        )
    }

    /// Classify a frame captured at `timestamp`
    pub fn process(&mut self, frame: &RgbImage, timestamp: DateTime<Local>) -> Result<FrameReport> {
        let Some(mask) = self.background.update(frame)? else {
            return Ok(FrameReport {
                warmup: true,
                status: RoomStatus::Unoccupied,
                regions: Vec::new(),
                event: None,
            });
        };

        let regions = self.regions.extract(&mask);
        let event = self.debouncer.observe(!regions.is_empty(), timestamp);

        Ok(FrameReport {
            warmup: false,
            status: self.debouncer.status(),
            regions,
            event,
        })
    }

    pub fn debouncer(&self) -> &MotionDebouncer {
        &self.debouncer
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }
}

/// Scale a frame to `width`, keeping its aspect ratio
pub fn resize_to_width(frame: RgbImage, width: u32) -> RgbImage {
    let (frame_width, frame_height) = frame.dimensions();
    if frame_width == width || frame_width == 0 {
        return frame;
    }

    let height = scaled_height(frame_width, frame_height, width);
    imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
}

/// Height of a `width x height` frame once resized to `target_width`
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (height as f64 * target_width as f64 / width as f64).round() as u32;
    scaled.max(1)
}

/// Loop settings that are not part of detection
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Frame-rate limit for the loop
    pub fps: u32,
    /// Processing width; frames are resized to it before detection
    pub resize_width: u32,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fps: config.fps,
            resize_width: config.resize_width,
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub motion_events: u64,
    pub uploads: u64,
    pub failed_uploads: u64,
    pub quit_requested: bool,
}

/// Pull frames until the source ends or the display asks to quit
///
/// Capture and display failures end the run. Upload failures are logged
/// and the run goes on; the confirmation still starts a cooldown.
pub fn run_pipeline<C, D>(
    capture: &mut C,
    session: &mut MotionSession,
    annotator: &Annotator,
    mut uploader: Option<&mut Uploader>,
    mut display: Option<&mut D>,
    options: &PipelineOptions,
) -> Result<RunSummary>
where
    C: CaptureSource,
    D: DisplaySink + ?Sized,
{
    let frame_duration = Duration::from_secs_f64(1.0 / options.fps.max(1) as f64);
    let mut summary = RunSummary::default();
    let mut total_capture_time = Duration::ZERO;
    let mut total_detect_time = Duration::ZERO;

    tracing::info!("Starting main pipeline loop");
    match &uploader {
        Some(uploader) => tracing::info!("Uploading confirmed motion to {}", uploader.store_name()),
        None => tracing::info!("Uploading disabled"),
    }
    if display.is_none() {
        tracing::info!("Press Ctrl+C to stop");
    }

    loop {
        let loop_start = Instant::now();

        let capture_start = Instant::now();
        let Some(frame) = capture.capture_frame()? else {
            tracing::info!("Frame source exhausted after {} frames", summary.frames);
            break;
        };
        total_capture_time += capture_start.elapsed();

        let timestamp = Local::now();
        let mut frame = resize_to_width(frame, options.resize_width);

        let detect_start = Instant::now();
        let report = session.process(&frame, timestamp)?;
        total_detect_time += detect_start.elapsed();
        summary.frames += 1;

        if report.warmup {
            continue;
        }

        annotator.annotate(&mut frame, report.status, timestamp, &report.regions);

        if let Some(event) = report.event {
            summary.motion_events += 1;
            tracing::info!(
                "Motion confirmed at {} ({} regions)",
                event.timestamp.format(crate::TIMESTAMP_FORMAT),
                report.regions.len()
            );

            if let Some(uploader) = uploader.as_deref_mut() {
                match uploader.on_motion_confirmed(&frame, event.timestamp) {
                    Ok(path) => {
                        summary.uploads += 1;
                        tracing::info!("Uploaded {}", path);
                    }
                    Err(e) => {
                        summary.failed_uploads += 1;
                        tracing::warn!("Upload failed, skipping: {}", e);
                    }
                }
            }
        }

        if let Some(display) = display.as_deref_mut() {
            if display.show(&frame)? == DisplayControl::Quit {
                tracing::info!("Quit requested from display");
                summary.quit_requested = true;
                break;
            }
        }

        if summary.frames % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / summary.frames as f64;
            let avg_detect_ms = total_detect_time.as_secs_f64() * 1000.0 / summary.frames as f64;
            tracing::info!(
                "Frame {}: capture={:.1}ms, detect={:.1}ms, status={}, events={}",
                summary.frames,
                avg_capture_ms,
                avg_detect_ms,
                report.status,
                summary.motion_events
            );
        }

        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }

    Ok(summary)
}
