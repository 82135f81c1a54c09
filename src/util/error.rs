//! Error types for featcrop.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for featcrop operations.
pub type FeatCropResult<T> = std::result::Result<T, FeatCropError>;

/// Which image of a template/photo pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSide {
    /// The small reference image being located.
    Template,
    /// The full-resolution photograph being searched.
    Target,
}

impl fmt::Display for ImageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSide::Template => f.write_str("template"),
            ImageSide::Target => f.write_str("target"),
        }
    }
}

/// Errors raised by the registration-and-crop pipeline.
///
/// Every variant is local to one template/photo pair; the batch layer
/// converts each into a per-pair result and keeps going. None of them
/// abort a run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeatCropError {
    /// The byte stream at `path` could not be decoded as an image.
    #[error("failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    /// Encoding or writing an output image failed.
    #[error("failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
    /// An image yielded no feature descriptors at all.
    #[error("no descriptors detected in the {side} image")]
    NoDescriptors { side: ImageSide },
    /// Too few correspondences survived the ratio test.
    #[error("{got} matches passed the ratio test, need at least {need}")]
    InsufficientMatches { got: usize, need: usize },
    /// No projective model reached the minimum consensus set.
    #[error("homography estimation failed: {reason}")]
    HomographyFailure { reason: &'static str },
    /// The clamped crop rectangle has zero area.
    #[error("crop degenerated to zero area after clamping to {width}x{height}")]
    DegenerateCrop { width: u32, height: u32 },
    /// Image dimensions the pipeline cannot work with.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// Catch-all for conditions the pipeline does not anticipate.
    #[error("unexpected error: {reason}")]
    Unexpected { reason: String },
}
