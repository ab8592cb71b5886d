mod webcam;

pub use webcam::WebcamCapture;

use crate::Result;
use image::RgbImage;
use std::collections::VecDeque;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame, or `None` once the source is exhausted
    fn capture_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}

/// Finite source replaying frames already in memory
pub struct FrameSequence {
    frames: VecDeque<RgbImage>,
    width: u32,
    height: u32,
}

impl FrameSequence {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            frames: frames.into(),
            width,
            height,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl CaptureSource for FrameSequence {
    fn capture_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
