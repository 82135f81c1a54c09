//! Scale- and rotation-invariant keypoint detection and description.
//!
//! The detector is ORB-class: FAST-9 corners found per pyramid level,
//! oriented by the intensity centroid, and described with steered
//! 256-bit BRIEF. Keypoint coordinates are always reported in base
//! image space regardless of the level they were found on.

pub mod brief;
pub mod fast;
pub mod pyramid;

use image::GrayImage;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::features::pyramid::PyramidLevel;
use crate::trace::{trace_event, trace_span};
use crate::util::{FeatCropError, FeatCropResult, ImageSide};

/// Keypoint in base-image coordinates with orientation in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Detection strength used for ranking and suppression.
    pub response: f32,
    pub angle: f32,
}

/// 256-bit binary descriptor stored as 32 bytes.
pub type Descriptor = [u8; 32];

/// Detector tunables.
///
/// Matching thresholds are algorithmic constants and live in
/// [`crate::matching`]; only the detection side is configurable.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// FAST intensity threshold.
    pub threshold: u8,
    /// Upper bound on keypoints kept per image, ranked by response.
    pub max_keypoints: usize,
    /// Number of pyramid levels considered.
    pub levels: usize,
    /// Downsampling factor between consecutive levels.
    pub scale_factor: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            max_keypoints: 1000,
            levels: 8,
            scale_factor: 1.2,
        }
    }
}

/// Detects keypoints and computes their descriptors on a grayscale
/// image.
///
/// Returns the keypoints and descriptors index-aligned. Fails with
/// [`FeatCropError::NoDescriptors`] when nothing is detected, naming
/// the `side` the image plays in its pair.
pub fn detect_and_describe(
    img: &GrayImage,
    cfg: &DetectorConfig,
    side: ImageSide,
) -> FeatCropResult<(Vec<Keypoint>, Vec<Descriptor>)> {
    let _span = trace_span!("detect_and_describe", levels = cfg.levels).entered();
    let levels = pyramid::build(img, cfg.levels, cfg.scale_factor);

    #[cfg(feature = "rayon")]
    let per_level: Vec<Vec<(Keypoint, Descriptor)>> = levels
        .par_iter()
        .map(|level| describe_level(level, cfg))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let per_level: Vec<Vec<(Keypoint, Descriptor)>> = levels
        .iter()
        .map(|level| describe_level(level, cfg))
        .collect();

    let mut features: Vec<(Keypoint, Descriptor)> = per_level.into_iter().flatten().collect();
    features.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
    features.truncate(cfg.max_keypoints);

    if features.is_empty() {
        return Err(FeatCropError::NoDescriptors { side });
    }
    trace_event!("features_detected", count = features.len());
    Ok(features.into_iter().unzip())
}

/// Runs detection and description on one pyramid level and maps the
/// keypoints back into base-image coordinates.
fn describe_level(level: &PyramidLevel, cfg: &DetectorConfig) -> Vec<(Keypoint, Descriptor)> {
    let corners = fast::detect(&level.image, cfg.threshold, cfg.max_keypoints);
    corners
        .into_iter()
        .map(|corner| {
            let angle = brief::orientation(&level.image, corner.x as u32, corner.y as u32);
            let descriptor =
                brief::describe(&level.image, corner.x as i32, corner.y as i32, angle);
            let keypoint = Keypoint {
                x: corner.x * level.scale,
                y: corner.y * level.scale,
                response: corner.response,
                angle,
            };
            (keypoint, descriptor)
        })
        .collect()
}
