use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};

/// Axis-aligned box around a detected region, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Tight box around a set of border points
    fn enclosing(points: &[Point<i32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

        for point in &points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Some(Self {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }
}

/// Number of pixels on or inside a traced border, holes included
///
/// The border is drawn into a padded canvas and everything 4-connected to
/// the padding is outside; the rest is enclosed. A solid `w x h` block
/// therefore measures exactly `w * h`, and a one pixel wide line its length.
pub fn enclosed_area(points: &[Point<i32>]) -> f64 {
    let Some(bounds) = BoundingBox::enclosing(points) else {
        return 0.0;
    };

    let (width, height) = (bounds.width + 2, bounds.height + 2);
    let mut canvas = GrayImage::new(width, height);
    for point in points {
        let x = (point.x - bounds.x as i32 + 1) as u32;
        let y = (point.y - bounds.y as i32 + 1) as u32;
        canvas.put_pixel(x, y, Luma([255]));
    }

    let labels = connected_components(&canvas, Connectivity::Four, Luma([255]));
    let outside = labels.get_pixel(0, 0)[0];
    let outside_pixels = labels.pixels().filter(|label| label[0] == outside).count();

    (width as usize * height as usize - outside_pixels) as f64
}

/// Turns a foreground mask into bounding boxes of sufficiently large blobs
pub struct RegionExtractor {
    min_area: f64,
}

impl RegionExtractor {
    pub fn new(min_area: f64) -> Self {
        Self { min_area }
    }

    /// Bounding boxes of outermost blobs whose area reaches `min_area`
    ///
    /// Holes, and blobs inside holes, are ignored. Boxes come back in the
    /// raster order their borders were discovered.
    pub fn extract(&self, mask: &GrayImage) -> Vec<BoundingBox> {
        let _span = tracing::debug_span!("extract_regions").entered();

        let boxes: Vec<BoundingBox> = find_contours::<i32>(mask)
            .into_iter()
            .filter(|contour| {
                matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
            })
            .filter(|contour| enclosed_area(&contour.points) >= self.min_area)
            .filter_map(|contour| BoundingBox::enclosing(&contour.points))
            .collect();

        tracing::debug!("{} regions above min_area {}", boxes.len(), self.min_area);
        boxes
    }

    pub fn min_area(&self) -> f64 {
        self.min_area
    }
}
