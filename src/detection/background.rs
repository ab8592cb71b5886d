use crate::{Error, Result};
use image::{imageops, GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::separable_filter_equal;
use imageproc::morphology::dilate;
use ndarray::{Array2, ArrayView2};

/// Side of the square Gaussian kernel used to suppress sensor noise
pub const BLUR_KERNEL_SIZE: u32 = 21;

/// Weight of the newest frame in the running average
pub const ACCUMULATE_WEIGHT: f32 = 0.5;

/// Number of 3x3 dilation passes applied to the thresholded mask
pub const DILATE_ITERATIONS: u8 = 2;

/// Sigma for a Gaussian kernel of the given size when no sigma is requested
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian taps, `kernel_size` wide and centered
pub fn gaussian_kernel(kernel_size: u32, sigma: f32) -> Vec<f32> {
    let radius = (kernel_size / 2) as i32;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|offset| (-((offset * offset) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();

    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|weight| weight / sum).collect()
}

type LevelImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Separable blur kept in floating point so the kernel tails survive
fn blur_levels(gray: &GrayImage, kernel: &[f32]) -> LevelImage {
    let levels: LevelImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32])
    });
    separable_filter_equal(&levels, kernel)
}

/// Exponentially weighted background estimate of a fixed scene
///
/// The accumulator is kept in floating point so repeated averaging does not
/// drift through 8-bit quantization. It is seeded from the first frame and
/// updated by the same rule on every later frame.
pub struct BackgroundModel {
    delta_thresh: u8,
    kernel: Vec<f32>,
    average: Option<Array2<f32>>,
}

impl BackgroundModel {
    pub fn new(delta_thresh: u8) -> Self {
        Self {
            delta_thresh,
            kernel: gaussian_kernel(BLUR_KERNEL_SIZE, kernel_sigma(BLUR_KERNEL_SIZE)),
            average: None,
        }
    }

    /// Fold a frame into the model and return its foreground mask
    ///
    /// Returns `Ok(None)` for the first frame, which only seeds the model.
    /// Later frames yield a 0/255 mask of pixels that differ from the
    /// rounded average by more than `delta_thresh`, dilated to close gaps.
    pub fn update(&mut self, frame: &RgbImage) -> Result<Option<GrayImage>> {
        let _span = tracing::debug_span!("background_update").entered();

        let gray = self.preprocess(frame);
        let (width, height) = gray.dimensions();

        let average = match self.average.as_mut() {
            Some(average) => average,
            None => {
                tracing::info!("Starting background model at {}x{}", width, height);
                self.average = Some(Array2::from_shape_fn(
                    (height as usize, width as usize),
                    |(y, x)| gray.get_pixel(x as u32, y as u32)[0] as f32,
                ));
                return Ok(None);
            }
        };

        let expected = (average.ncols() as u32, average.nrows() as u32);
        if expected != (width, height) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: (width, height),
            });
        }

        let threshold = self.delta_thresh as f32;
        let mut mask = GrayImage::new(width, height);

        for (x, y, pixel) in gray.enumerate_pixels() {
            let value = pixel[0] as f32;
            let avg = &mut average[[y as usize, x as usize]];
            *avg = *avg * (1.0 - ACCUMULATE_WEIGHT) + value * ACCUMULATE_WEIGHT;

            // Halves round to even, as 8-bit conversions of the average do
            let background = avg.round_ties_even().clamp(0.0, 255.0);
            if (value - background).abs() > threshold {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        // LInf radius 2 is the same as two passes of a 3x3 square
        Ok(Some(dilate(&mask, Norm::LInf, DILATE_ITERATIONS)))
    }

    /// Whether the first frame has been seen
    pub fn is_initialized(&self) -> bool {
        self.average.is_some()
    }

    /// Current running average, indexed `[y, x]`
    pub fn average(&self) -> Option<ArrayView2<'_, f32>> {
        self.average.as_ref().map(|average| average.view())
    }

    fn preprocess(&self, frame: &RgbImage) -> GrayImage {
        let gray = imageops::grayscale(frame);
        let blurred = blur_levels(&gray, &self.kernel);
        ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([blurred.get_pixel(x, y)[0].round_ties_even().clamp(0.0, 255.0) as u8])
        })
    }
}
