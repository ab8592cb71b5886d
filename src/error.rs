//! Error types for the motion detection library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file is missing, malformed or holds invalid values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Camera could not be opened or a frame could not be read
    #[error("Capture error: {0}")]
    Capture(String),

    /// A frame does not match the dimensions the background model was built with
    #[error("Frame is {actual:?} but the background model is {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Image encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote or local object store rejected a write
    #[error("Upload error: {0}")]
    Upload(String),

    /// Live display could not be opened or updated
    #[error("Display error: {0}")]
    Display(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
