use super::{DisplayControl, DisplaySink};
use crate::{Error, Result};
use image::RgbImage;
use minifb::{Key, Window, WindowOptions};

/// Desktop preview window; `q` or closing the window stops the loop
pub struct WindowDisplay {
    window: Window,
    buffer: Vec<u32>,
}

impl WindowDisplay {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        tracing::info!("Opening preview window ({}x{})", width, height);

        let window = Window::new(
            title,
            width as usize,
            height as usize,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| Error::Display(format!("Failed to open preview window: {}", e)))?;

        Ok(Self {
            window,
            buffer: Vec::new(),
        })
    }

    fn quit_requested(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Q)
    }
}

impl DisplaySink for WindowDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<DisplayControl> {
        if self.quit_requested() {
            return Ok(DisplayControl::Quit);
        }

        // minifb wants 0RGB packed into u32
        self.buffer.clear();
        self.buffer.extend(
            frame
                .pixels()
                .map(|p| (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32),
        );

        let (width, height) = frame.dimensions();
        self.window
            .update_with_buffer(&self.buffer, width as usize, height as usize)
            .map_err(|e| Error::Display(format!("Failed to update preview window: {}", e)))?;

        if self.quit_requested() {
            Ok(DisplayControl::Quit)
        } else {
            Ok(DisplayControl::Continue)
        }
    }
}
