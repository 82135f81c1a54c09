//! FeatCrop locates a small reference template inside full-resolution
//! photographs via feature-based registration and derives an
//! aspect-locked crop around the matched region.
//!
//! The per-pair pipeline is: decode → grayscale → keypoints and
//! descriptors → ratio-test matching → RANSAC homography → crop
//! geometry → optional Lanczos resampling → encode. The batch layer
//! drives the pipeline over template/photo pairs with per-pair failure
//! isolation, reporting progress through a caller-supplied callback.
//!
//! Parallel detection and matching are available via the `rayon`
//! feature; span/event instrumentation via the `tracing` feature.

pub mod batch;
pub mod codec;
pub mod crop;
pub mod features;
pub mod homography;
pub mod matching;
pub mod render;
pub(crate) mod trace;
pub mod util;

pub use batch::{run, BatchEvent, BatchOptions, BatchSummary, PairStatus, ProcessingResult};
pub use crop::{resolve_crop, CropBox};
pub use features::{detect_and_describe, Descriptor, DetectorConfig, Keypoint};
pub use homography::{estimate_homography, Homography};
pub use matching::{match_descriptors, Correspondence};
pub use render::{render, RenderedCrops};
pub use util::{FeatCropError, FeatCropResult, ImageSide};
