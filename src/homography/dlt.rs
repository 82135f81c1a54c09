//! Hartley-normalized direct linear transform.
//!
//! Points on each side are translated to their centroid and scaled to
//! a mean distance of sqrt(2) before the solve; the conditioning of
//! the 2n x 9 system depends on it. The null vector is taken from the
//! eigendecomposition of `A^T A`, which works for the minimal 4-point
//! sample and overdetermined refits alike.

use nalgebra::{DMatrix, Matrix3, SymmetricEigen};

use super::Homography;

/// Minimum correspondences for the projective solve.
pub(crate) const MIN_POINTS: usize = 4;

/// Estimates a homography mapping `src` points onto `dst` points.
///
/// Returns `None` when the system is degenerate: too few points, a
/// collapsed point configuration, or a vanishing scale term.
pub(crate) fn estimate(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < MIN_POINTS {
        return None;
    }
    let (src_n, t_src) = normalize(src)?;
    let (dst_n, t_dst) = normalize(dst)?;

    let n = src_n.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let (x, y) = src_n[i];
        let (u, v) = dst_n[i];
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let eigen = SymmetricEigen::new(a.transpose() * &a);
    let mut min_idx = 0;
    for i in 1..eigen.eigenvalues.len() {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_idx] {
            min_idx = i;
        }
    }
    let h = eigen.eigenvectors.column(min_idx);
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse()?;
    let mut m = t_dst_inv * hn * t_src;
    let scale = m[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    m /= scale;
    Some(Homography::from_matrix(m))
}

/// Hartley normalization: centroid at the origin, mean distance
/// sqrt(2). Returns the normalized points and their transform.
fn normalize(points: &[(f64, f64)]) -> Option<(Vec<(f64, f64)>, Matrix3<f64>)> {
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.0 - mx).powi(2) + (p.1 - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * mx, 0.0, s, -s * my, 0.0, 0.0, 1.0);
    let normalized = points.iter().map(|p| (s * (p.0 - mx), s * (p.1 - my))).collect();
    Some((normalized, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points() -> Vec<(f64, f64)> {
        let mut pts = Vec::new();
        for gy in 0..5 {
            for gx in 0..5 {
                pts.push((gx as f64 * 37.0 + 11.0, gy as f64 * 29.0 + 5.0));
            }
        }
        pts
    }

    #[test]
    fn recovers_a_known_projective_transform() {
        let truth = Homography::from_matrix(Matrix3::new(
            1.1, 0.02, 5.0, //
            -0.01, 0.97, -3.0, //
            1e-5, 2e-5, 1.0,
        ));
        let src = grid_points();
        let dst: Vec<(f64, f64)> = src.iter().map(|p| truth.project(p.0, p.1)).collect();

        let estimated = estimate(&src, &dst).unwrap();
        for p in &src {
            let (ex, ey) = estimated.project(p.0, p.1);
            let (tx, ty) = truth.project(p.0, p.1);
            assert!((ex - tx).abs() < 1e-6);
            assert!((ey - ty).abs() < 1e-6);
        }
    }

    #[test]
    fn recovers_a_pure_translation() {
        let src = vec![(0.0, 0.0), (100.0, 0.0), (100.0, 80.0), (0.0, 80.0)];
        let dst: Vec<(f64, f64)> = src.iter().map(|p| (p.0 + 250.0, p.1 + 130.0)).collect();

        let estimated = estimate(&src, &dst).unwrap();
        let (x, y) = estimated.project(50.0, 40.0);
        assert!((x - 300.0).abs() < 1e-6);
        assert!((y - 170.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_too_few_points() {
        let src = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let dst = src.clone();
        assert!(estimate(&src, &dst).is_none());
    }

    #[test]
    fn rejects_collapsed_points() {
        let src = vec![(5.0, 5.0); 4];
        let dst = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(estimate(&src, &dst).is_none());
    }
}
