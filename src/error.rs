/// Error types for halftoning configuration and runs.
///
/// Only configuration-time problems are errors. Numeric policies such as
/// clamping table lookups to 0-255 or dropping error diffused past the image
/// edge are normal behaviour and never surface here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HalftoneError {
    #[error("Missing mandatory module: {0}")]
    MissingModule(&'static str),
    #[error("Error matrix divisor must not be zero")]
    ZeroDivisor,
    #[error("Matrix data length {len} doesn't match {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: usize,
        height: usize,
    },
    #[error("Matrix must have at least one row and one column")]
    EmptyMatrix,
    #[error("Source offset {offset} is outside matrix width {width}")]
    OffsetOutOfRange { offset: usize, width: usize },
    #[error("Vector error filter needs a single-row matrix, got {0} rows")]
    NotAVector(usize),
    #[error("Space-filling curve size {0} is not a power of two")]
    NotPowerOfTwo(usize),
    #[error("Bayer matrix order must be 1-8, got {0}")]
    BayerOrder(u32),
    #[error("Invalid cell size range {min}..={max}")]
    InvalidCellSize { min: usize, max: usize },
    #[error("Spot function distance must be positive, got {0}")]
    InvalidSpotDistance(f64),
    #[error("Image has zero width or height")]
    EmptyImage,
    #[error("Image {width}x{height} is too large to address")]
    ImageTooLarge { width: usize, height: usize },
    #[error("Pixel data length {len} doesn't match {width}x{height}")]
    PixelCount {
        len: usize,
        width: usize,
        height: usize,
    },
    #[error("Unknown {category} '{name}'")]
    UnknownModule { category: &'static str, name: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HalftoneError>;

impl From<serde_json::Error> for HalftoneError {
    fn from(e: serde_json::Error) -> Self {
        HalftoneError::Config(e.to_string())
    }
}
