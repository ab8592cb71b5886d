use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};

/// Glyph cell size of the bitmap font at scale 1
pub const GLYPH_SIZE: u32 = 8;

/// Pixel height of a line of text at the given scale
pub fn line_height(scale: u32) -> u32 {
    GLYPH_SIZE * scale
}

/// Draw `text` with its top-left corner at (x, y), clipped to the canvas
///
/// Characters missing from the basic Latin set advance the cursor without
/// drawing anything.
pub fn draw_text_mut(
    canvas: &mut RgbImage,
    color: Rgb<u8>,
    x: i32,
    y: i32,
    scale: u32,
    text: &str,
) {
    let (width, height) = canvas.dimensions();
    let scale = scale.max(1);
    let advance = (GLYPH_SIZE * scale) as i32;

    for (index, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let origin_x = x + index as i32 * advance;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + (col * scale + dx) as i32;
                        let py = y + (row as u32 * scale + dy) as i32;
                        if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                            canvas.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}
