mod background;
mod debounce;
mod regions;

pub use background::{
    gaussian_kernel, kernel_sigma, BackgroundModel, ACCUMULATE_WEIGHT, BLUR_KERNEL_SIZE,
    DILATE_ITERATIONS,
};
pub use debounce::{MotionDebouncer, MotionEvent, RoomStatus};
pub use regions::{enclosed_area, BoundingBox, RegionExtractor};
