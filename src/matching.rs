//! Descriptor matching with Lowe's ratio test.
//!
//! Every template descriptor is compared against all target
//! descriptors by Hamming distance; a correspondence is accepted only
//! when the best distance is clearly below the second best. The ratio
//! rejects ambiguous matches where two target regions look almost
//! equally similar.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::features::{Descriptor, Keypoint};
use crate::trace::{trace_event, trace_span};
use crate::util::{FeatCropError, FeatCropResult, ImageSide};

/// Accept a match only when `best < RATIO * second_best`.
const RATIO: f32 = 0.7;

/// Minimum accepted correspondences for a usable registration.
const MIN_MATCHES: usize = 10;

/// A template/target point pair accepted by the ratio test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Keypoint location in the template image.
    pub template: (f32, f32),
    /// Keypoint location in the target image.
    pub target: (f32, f32),
    /// Hamming distance of the winning descriptor pair.
    pub distance: u32,
}

/// Matches template descriptors against target descriptors.
///
/// Keypoint and descriptor slices must be index-aligned per side, as
/// produced by [`crate::features::detect_and_describe`]. Fails with
/// [`FeatCropError::NoDescriptors`] on an empty side and with
/// [`FeatCropError::InsufficientMatches`] when fewer than ten
/// correspondences survive the ratio test.
pub fn match_descriptors(
    template_keypoints: &[Keypoint],
    template_descriptors: &[Descriptor],
    target_keypoints: &[Keypoint],
    target_descriptors: &[Descriptor],
) -> FeatCropResult<Vec<Correspondence>> {
    if template_descriptors.is_empty() {
        return Err(FeatCropError::NoDescriptors {
            side: ImageSide::Template,
        });
    }
    if target_descriptors.is_empty() {
        return Err(FeatCropError::NoDescriptors {
            side: ImageSide::Target,
        });
    }
    if template_keypoints.len() != template_descriptors.len()
        || target_keypoints.len() != target_descriptors.len()
    {
        return Err(FeatCropError::Unexpected {
            reason: "keypoint and descriptor counts disagree".to_string(),
        });
    }
    let _span = trace_span!(
        "match_descriptors",
        template = template_descriptors.len(),
        target = target_descriptors.len()
    )
    .entered();

    let accept = |(index, descriptor): (usize, &Descriptor)| -> Option<Correspondence> {
        let mut best = u32::MAX;
        let mut second = u32::MAX;
        let mut best_idx = 0usize;
        for (j, candidate) in target_descriptors.iter().enumerate() {
            let distance = hamming(descriptor, candidate);
            if distance < best {
                second = best;
                best = distance;
                best_idx = j;
            } else if distance < second {
                second = distance;
            }
        }
        // A single target descriptor leaves nothing to compare against.
        if second == u32::MAX {
            return None;
        }
        if (best as f32) < RATIO * (second as f32) {
            let t = template_keypoints[index];
            let g = target_keypoints[best_idx];
            Some(Correspondence {
                template: (t.x, t.y),
                target: (g.x, g.y),
                distance: best,
            })
        } else {
            None
        }
    };

    #[cfg(feature = "rayon")]
    let accepted: Vec<Correspondence> = template_descriptors
        .par_iter()
        .enumerate()
        .filter_map(accept)
        .collect();
    #[cfg(not(feature = "rayon"))]
    let accepted: Vec<Correspondence> = template_descriptors
        .iter()
        .enumerate()
        .filter_map(accept)
        .collect();

    if accepted.len() < MIN_MATCHES {
        return Err(FeatCropError::InsufficientMatches {
            got: accepted.len(),
            need: MIN_MATCHES,
        });
    }
    trace_event!("ratio_test_survivors", accepted = accepted.len());
    Ok(accepted)
}

fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}
