mod loopback;
#[cfg(feature = "window")]
mod window;

pub use loopback::LoopbackDisplay;
#[cfg(feature = "window")]
pub use window::WindowDisplay;

use crate::Result;
use image::RgbImage;

/// What the loop should do after a frame was shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayControl {
    Continue,
    Quit,
}

/// Trait for live views of the annotated feed
pub trait DisplaySink {
    /// Present a frame and report whether the viewer asked to stop
    fn show(&mut self, frame: &RgbImage) -> Result<DisplayControl>;
}
