use super::{DisplayControl, DisplaySink};
use crate::{Error, Result};
use image::{Rgb, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Streams the annotated feed into a v4l2loopback device
///
/// Any video player can then open the device as a live view. There is no
/// keyboard here, so this sink never asks the loop to quit.
pub struct LoopbackDisplay {
    _device: Device,
    file: File,
    width: u32,
    height: u32,
}

impl LoopbackDisplay {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path).map_err(|e| {
            Error::Display(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let format = Output::set_format(&device, &requested).map_err(|e| {
            Error::Display(format!("Failed to set YUYV output format: {}", e))
        })?;
        if (format.width, format.height) != (width, height) {
            tracing::warn!(
                "Loopback device accepted {}x{} instead of {}x{}",
                format.width,
                format.height,
                width,
                height
            );
        }

        // v4l2loopback takes raw frames written to the device file
        let file = File::options().write(true).open(path).map_err(|e| {
            Error::Display(format!("Failed to open {} for writing: {}", path.display(), e))
        })?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            _device: device,
            file,
            width: format.width,
            height: format.height,
        })
    }
}

/// Studio-swing BT.601 luma, 16 for black up to 235 for white
fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0.map(i32::from);
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8
}

/// BT.601 Cb and Cr of a horizontal pixel pair, taken from their mean color
fn chroma(left: &Rgb<u8>, right: &Rgb<u8>) -> (u8, u8) {
    let [r, g, b] = [0, 1, 2].map(|c| (i32::from(left[c]) + i32::from(right[c])) / 2);
    let cb = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let cr = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
    (cb as u8, cr as u8)
}

/// Pack a frame as YUYV 4:2:2; an odd last column pairs with itself
fn pack_yuyv(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut packed = Vec::with_capacity((width.div_ceil(2) * 4 * height) as usize);

    for row in frame.rows() {
        let pixels: Vec<&Rgb<u8>> = row.collect();
        for pair in pixels.chunks(2) {
            let left = pair[0];
            let right = pair.get(1).copied().unwrap_or(left);
            let (cb, cr) = chroma(left, right);
            packed.extend_from_slice(&[luma(left), cb, luma(right), cr]);
        }
    }

    packed
}

impl DisplaySink for LoopbackDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<DisplayControl> {
        let _span = tracing::debug_span!("loopback_write").entered();

        let yuyv = if frame.dimensions() != (self.width, self.height) {
            let resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            pack_yuyv(&resized)
        } else {
            pack_yuyv(frame)
        };

        self.file.write_all(&yuyv).map_err(|e| {
            Error::Display(format!("Failed to write frame to loopback device: {}", e))
        })?;

        Ok(DisplayControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_layout() {
        let mut frame = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        frame.put_pixel(1, 0, Rgb([255, 255, 255]));

        let packed = pack_yuyv(&frame);
        assert_eq!(packed.len(), 4 * 2 * 2);

        // Black then white: studio-range luma, neutral chroma from mid gray
        assert_eq!(&packed[..4], &[16, 128, 235, 128]);
        assert_eq!(&packed[4..8], &[16, 128, 16, 128]);
    }

    #[test]
    fn test_red_pushes_cr_up() {
        let frame = RgbImage::from_pixel(2, 1, Rgb([255, 0, 0]));
        let packed = pack_yuyv(&frame);

        assert_eq!(packed[0], packed[2]);
        assert!(packed[1] < 128);
        assert_eq!(packed[3], 240);
    }

    #[test]
    fn test_odd_width_repeats_last_pixel() {
        let frame = RgbImage::from_pixel(3, 1, Rgb([255, 255, 255]));
        assert_eq!(pack_yuyv(&frame), vec![235, 128, 235, 128, 235, 128, 235, 128]);
    }
}
