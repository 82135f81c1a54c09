//! Shared utility helpers.

pub mod error;

pub use error::{FeatCropError, FeatCropResult, ImageSide};
