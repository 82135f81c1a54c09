//! Projective transform estimation from point correspondences.

pub mod dlt;
pub mod ransac;

pub use ransac::estimate_homography;

use nalgebra::{Matrix3, Vector3};

/// 3x3 projective transform mapping template-plane coordinates into
/// target-plane coordinates.
///
/// Only [`estimate_homography`] produces values of this type inside
/// the pipeline, so a `Homography` always comes from a correspondence
/// set that reached the minimum consensus.
#[derive(Debug, Clone, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    /// Wraps a raw matrix, normalized by the caller.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self(matrix)
    }

    /// Returns the underlying matrix.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Maps `(x, y)` into the target plane with perspective division.
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let v = self.0 * Vector3::new(x, y, 1.0);
        (v.x / v.z, v.y / v.z)
    }
}
