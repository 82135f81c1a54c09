//! Random-sample consensus over the DLT solve.
//!
//! Samples are drawn with a seeded linear congruential generator so a
//! given correspondence set always estimates the same model; there is
//! no hidden global randomness.

use crate::matching::Correspondence;
use crate::trace::{trace_event, trace_span};
use crate::util::{FeatCropError, FeatCropResult};

use super::{dlt, Homography};

/// Reprojection error (pixels) below which a correspondence is an inlier.
const REPROJ_THRESHOLD: f64 = 5.0;

/// Consensus sets below this size reject the model. Twice the minimal
/// sample, so the final refit is always overdetermined.
const MIN_INLIERS: usize = 8;

/// Fixed iteration budget.
const MAX_ITERATIONS: usize = 1000;

/// Estimates a projective transform from correspondences, tolerating
/// outliers.
///
/// Fails with [`FeatCropError::HomographyFailure`] when no model
/// reaches the internal minimum consensus set. The winning model is
/// refit on its full inlier set before being returned.
pub fn estimate_homography(correspondences: &[Correspondence]) -> FeatCropResult<Homography> {
    let _span = trace_span!("estimate_homography", correspondences = correspondences.len()).entered();
    if correspondences.len() < dlt::MIN_POINTS {
        return Err(FeatCropError::HomographyFailure {
            reason: "fewer correspondences than a minimal sample",
        });
    }

    let src: Vec<(f64, f64)> = correspondences
        .iter()
        .map(|c| (c.template.0 as f64, c.template.1 as f64))
        .collect();
    let dst: Vec<(f64, f64)> = correspondences
        .iter()
        .map(|c| (c.target.0 as f64, c.target.1 as f64))
        .collect();

    let threshold_sq = REPROJ_THRESHOLD * REPROJ_THRESHOLD;
    let mut best: Option<Homography> = None;
    let mut best_mask = vec![false; correspondences.len()];
    let mut best_count = 0usize;

    for iteration in 0..MAX_ITERATIONS {
        let sample = sample_unique(correspondences.len(), dlt::MIN_POINTS, iteration as u64 + 1);
        if degenerate_sample(&sample, &src) || degenerate_sample(&sample, &dst) {
            continue;
        }
        let sample_src: Vec<(f64, f64)> = sample.iter().map(|&j| src[j]).collect();
        let sample_dst: Vec<(f64, f64)> = sample.iter().map(|&j| dst[j]).collect();
        let Some(model) = dlt::estimate(&sample_src, &sample_dst) else {
            continue;
        };

        let mut mask = vec![false; correspondences.len()];
        let mut count = 0usize;
        for j in 0..correspondences.len() {
            if reprojection_error_sq(&model, src[j], dst[j]) <= threshold_sq {
                mask[j] = true;
                count += 1;
            }
        }
        if count > best_count {
            best_count = count;
            best_mask = mask;
            best = Some(model);
            if best_count == correspondences.len() {
                break;
            }
        }
    }

    let Some(model) = best else {
        return Err(FeatCropError::HomographyFailure {
            reason: "no sample produced a projective model",
        });
    };
    if best_count < MIN_INLIERS {
        return Err(FeatCropError::HomographyFailure {
            reason: "largest consensus set is below the minimum",
        });
    }
    trace_event!("ransac_consensus", inliers = best_count);

    let inlier_src: Vec<(f64, f64)> = src
        .iter()
        .zip(best_mask.iter())
        .filter_map(|(p, &keep)| keep.then_some(*p))
        .collect();
    let inlier_dst: Vec<(f64, f64)> = dst
        .iter()
        .zip(best_mask.iter())
        .filter_map(|(p, &keep)| keep.then_some(*p))
        .collect();

    Ok(dlt::estimate(&inlier_src, &inlier_dst).unwrap_or(model))
}

fn reprojection_error_sq(model: &Homography, src: (f64, f64), dst: (f64, f64)) -> f64 {
    let (px, py) = model.project(src.0, src.1);
    if !px.is_finite() || !py.is_finite() {
        return f64::INFINITY;
    }
    let dx = px - dst.0;
    let dy = py - dst.1;
    dx * dx + dy * dy
}

/// True when any three points of the sample are (nearly) collinear; a
/// minimal DLT sample needs four points in general position.
fn degenerate_sample(sample: &[usize], points: &[(f64, f64)]) -> bool {
    for a in 0..sample.len() {
        for b in (a + 1)..sample.len() {
            for c in (b + 1)..sample.len() {
                let p = points[sample[a]];
                let q = points[sample[b]];
                let r = points[sample[c]];
                let area2 = (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0);
                if area2.abs() < 1e-9 {
                    return true;
                }
            }
        }
    }
    false
}

/// Draws `k` distinct indices in `[0, n)` from a seeded LCG.
fn sample_unique(n: usize, k: usize, seed: u64) -> Vec<usize> {
    let mut out = Vec::with_capacity(k);
    let mut used = vec![false; n];
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    while out.len() < k {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let idx = ((state >> 16) as usize) % n;
        if !used[idx] {
            used[idx] = true;
            out.push(idx);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    fn correspondence(template: (f64, f64), target: (f64, f64)) -> Correspondence {
        Correspondence {
            template: (template.0 as f32, template.1 as f32),
            target: (target.0 as f32, target.1 as f32),
            distance: 0,
        }
    }

    fn truth() -> Homography {
        Homography::from_matrix(Matrix3::new(
            0.9, 0.05, 120.0, //
            -0.04, 1.1, 60.0, //
            0.0, 0.0, 1.0,
        ))
    }

    fn inlier_set() -> Vec<Correspondence> {
        let truth = truth();
        let mut out = Vec::new();
        for gy in 0..5 {
            for gx in 0..4 {
                let p = (gx as f64 * 31.0 + 7.0, gy as f64 * 23.0 + 13.0);
                out.push(correspondence(p, truth.project(p.0, p.1)));
            }
        }
        out
    }

    #[test]
    fn recovers_the_transform_from_clean_correspondences() {
        let model = estimate_homography(&inlier_set()).unwrap();
        let truth = truth();
        for p in [(0.0, 0.0), (80.0, 0.0), (80.0, 100.0), (0.0, 100.0)] {
            let (ex, ey) = model.project(p.0, p.1);
            let (tx, ty) = truth.project(p.0, p.1);
            assert!((ex - tx).abs() < 1e-3, "x {ex} vs {tx}");
            assert!((ey - ty).abs() < 1e-3, "y {ey} vs {ty}");
        }
    }

    #[test]
    fn tolerates_a_quarter_of_outliers() {
        let mut correspondences = inlier_set();
        for i in 0..5 {
            correspondences.push(correspondence(
                (i as f64 * 17.0 + 3.0, i as f64 * 11.0 + 29.0),
                (900.0 - i as f64 * 50.0, 700.0 + i as f64 * 35.0),
            ));
        }

        let model = estimate_homography(&correspondences).unwrap();
        let truth = truth();
        let (ex, ey) = model.project(40.0, 50.0);
        let (tx, ty) = truth.project(40.0, 50.0);
        assert!((ex - tx).abs() < 1.0);
        assert!((ey - ty).abs() < 1.0);
    }

    #[test]
    fn too_few_correspondences_fail() {
        let set = vec![
            correspondence((0.0, 0.0), (1.0, 1.0)),
            correspondence((10.0, 0.0), (11.0, 1.0)),
            correspondence((0.0, 10.0), (1.0, 11.0)),
        ];
        let err = estimate_homography(&set).unwrap_err();
        assert!(matches!(err, FeatCropError::HomographyFailure { .. }));
    }

    #[test]
    fn collinear_correspondences_fail() {
        // All points on one line: every sample is degenerate.
        let set: Vec<Correspondence> = (0..12)
            .map(|i| {
                let p = (i as f64 * 10.0, i as f64 * 5.0);
                correspondence(p, (p.0 + 50.0, p.1 + 20.0))
            })
            .collect();
        let err = estimate_homography(&set).unwrap_err();
        assert!(matches!(err, FeatCropError::HomographyFailure { .. }));
    }

    #[test]
    fn estimation_is_deterministic() {
        let mut correspondences = inlier_set();
        correspondences.push(correspondence((1.0, 2.0), (500.0, 500.0)));

        let a = estimate_homography(&correspondences).unwrap();
        let b = estimate_homography(&correspondences).unwrap();
        assert_eq!(a, b);
    }
}
