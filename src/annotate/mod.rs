mod text;

use text::{draw_text_mut, line_height};

use crate::detection::{BoundingBox, RoomStatus};
use crate::TIMESTAMP_FORMAT;
use chrono::{DateTime, Local};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Distance of the status and timestamp lines from the frame edges
pub const TEXT_MARGIN: i32 = 10;

/// Draws detection results onto frames for display and upload
#[derive(Debug, Clone)]
pub struct Annotator {
    box_thickness: u32,
    text_scale: u32,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            box_thickness: 2,
            text_scale: 1,
        }
    }
}

impl Annotator {
    pub fn new(box_thickness: u32, text_scale: u32) -> Self {
        Self {
            box_thickness: box_thickness.max(1),
            text_scale: text_scale.max(1),
        }
    }

    /// Draw region boxes, the room status and the frame timestamp
    pub fn annotate(
        &self,
        frame: &mut RgbImage,
        status: RoomStatus,
        timestamp: DateTime<Local>,
        boxes: &[BoundingBox],
    ) {
        let _span = tracing::debug_span!("annotate").entered();

        for bounding_box in boxes {
            self.draw_box(frame, bounding_box);
        }

        draw_text_mut(
            frame,
            TEXT_COLOR,
            TEXT_MARGIN,
            TEXT_MARGIN,
            self.text_scale,
            &format!("Room Status: {}", status),
        );

        let timestamp_y = frame.height() as i32 - TEXT_MARGIN - line_height(self.text_scale) as i32;
        draw_text_mut(
            frame,
            TEXT_COLOR,
            TEXT_MARGIN,
            timestamp_y,
            self.text_scale,
            &timestamp.format(TIMESTAMP_FORMAT).to_string(),
        );
    }

    fn draw_box(&self, frame: &mut RgbImage, bounding_box: &BoundingBox) {
        // Nested 1px outlines, outermost on the box edge
        for inset in 0..self.box_thickness {
            let width = bounding_box.width.saturating_sub(2 * inset);
            let height = bounding_box.height.saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }

            let rect = Rect::at(
                (bounding_box.x + inset) as i32,
                (bounding_box.y + inset) as i32,
            )
            .of_size(width, height);
            draw_hollow_rect_mut(frame, rect, BOX_COLOR);
        }
    }
}
