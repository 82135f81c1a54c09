//! Scale pyramid for multi-octave keypoint detection.
//!
//! Each level is resampled directly from the base image so the scale
//! attached to a level is exact, not accumulated across resizes.

use image::{imageops, GrayImage};

/// Smallest side length a level may have; finer levels are dropped.
const MIN_LEVEL_SIDE: u32 = 40;

/// One pyramid level and the factor mapping its coordinates back to
/// the base image.
pub struct PyramidLevel {
    pub image: GrayImage,
    pub scale: f32,
}

/// Builds at most `levels` levels separated by `scale_factor`.
///
/// Level 0 is the base resolution; construction stops early once a
/// level would fall under the minimum side length.
pub fn build(base: &GrayImage, levels: usize, scale_factor: f32) -> Vec<PyramidLevel> {
    let mut out = Vec::with_capacity(levels.max(1));
    out.push(PyramidLevel {
        image: base.clone(),
        scale: 1.0,
    });

    let mut scale = 1.0f32;
    for _ in 1..levels.max(1) {
        scale *= scale_factor;
        let width = (base.width() as f32 / scale) as u32;
        let height = (base.height() as f32 / scale) as u32;
        if width < MIN_LEVEL_SIDE || height < MIN_LEVEL_SIDE {
            break;
        }
        let image = imageops::resize(base, width, height, imageops::FilterType::Triangle);
        out.push(PyramidLevel { image, scale });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_level_is_untouched() {
        let base = GrayImage::from_fn(100, 80, |x, y| image::Luma([(x + y) as u8]));
        let pyramid = build(&base, 4, 1.2);

        assert_eq!(pyramid[0].scale, 1.0);
        assert_eq!(pyramid[0].image.dimensions(), (100, 80));
    }

    #[test]
    fn levels_shrink_by_the_scale_factor() {
        let base = GrayImage::new(240, 240);
        let pyramid = build(&base, 3, 2.0);

        assert_eq!(pyramid.len(), 3);
        assert_eq!(pyramid[1].image.dimensions(), (120, 120));
        assert_eq!(pyramid[2].image.dimensions(), (60, 60));
    }

    #[test]
    fn construction_stops_at_the_minimum_side() {
        let base = GrayImage::new(90, 90);
        let pyramid = build(&base, 8, 2.0);

        // 90 → 45 → (22 < 40, dropped)
        assert_eq!(pyramid.len(), 2);
        for level in &pyramid {
            assert!(level.image.width() >= MIN_LEVEL_SIDE);
            assert!(level.image.height() >= MIN_LEVEL_SIDE);
        }
    }
}
