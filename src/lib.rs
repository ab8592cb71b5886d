//! Motion detection for a single camera.
//!
//! Frames are compared against a running background average, foreground
//! blobs above a minimum area become regions, and a debouncer decides when
//! a streak of motion is worth reporting. Confirmed frames are annotated and
//! handed to an [`upload::Uploader`]; every frame can also be sent to a
//! [`display::DisplaySink`].
//!
//! The daemon binary wires these pieces to a webcam. The pieces themselves
//! only depend on `image` buffers, so they can be driven from any source.

pub mod annotate;
pub mod capture;
pub mod config;
pub mod detection;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod upload;

pub use config::Config;
pub use error::{Error, Result};

/// Timestamp layout used on annotated frames and in upload paths
pub const TIMESTAMP_FORMAT: &str = "%A %d %B %Y %H:%M:%S";
