//! Aspect-locked crop geometry derived from a registered template.
//!
//! The template's extent is projected into the target plane and
//! reduced to an axis-aligned bounding box. The crop keeps the
//! bounding-box height and derives its width from the requested
//! aspect; the detected width is discarded on purpose, so batches
//! framed against the same template stay vertically consistent even
//! when perspective skews the horizontal extent.

use crate::homography::Homography;
use crate::trace::{trace_event, trace_span};
use crate::util::{FeatCropError, FeatCropResult};

/// Axis-aligned crop rectangle in target pixel coordinates.
///
/// Invariants: `0 <= x1 < x2 <= width` and `0 <= y1 < y2 <= height` of
/// the target image; when clamping did not cut into the rectangle,
/// `(x2 - x1) / (y2 - y1)` matches the requested aspect within one
/// pixel of rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropBox {
    /// Crop width in pixels.
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    /// Crop height in pixels.
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Derives the crop rectangle for a template registered onto a target
/// image of `target_width` x `target_height` pixels.
///
/// `aspect` is requested width over requested height. The rectangle is
/// centered on the projected bounding box, sized `height x aspect` by
/// `height`, truncated to integers, and clamped to the image bounds.
/// A rectangle that clamps to zero area fails with
/// [`FeatCropError::DegenerateCrop`].
pub fn resolve_crop(
    homography: &Homography,
    template_width: u32,
    template_height: u32,
    target_width: u32,
    target_height: u32,
    aspect: f64,
) -> FeatCropResult<CropBox> {
    let _span = trace_span!("resolve_crop", aspect = aspect).entered();
    if target_width == 0 || target_height == 0 {
        return Err(FeatCropError::InvalidDimensions {
            width: target_width,
            height: target_height,
        });
    }
    if !aspect.is_finite() || aspect <= 0.0 {
        return Err(FeatCropError::Unexpected {
            reason: format!("aspect ratio {aspect} is not a positive finite number"),
        });
    }

    let w = template_width as f64;
    let h = template_height as f64;
    let corners = [(0.0, 0.0), (0.0, h), (w, h), (w, 0.0)];
    let projected = corners.map(|(x, y)| homography.project(x, y));
    if projected
        .iter()
        .any(|p| !p.0.is_finite() || !p.1.is_finite())
    {
        return Err(FeatCropError::Unexpected {
            reason: "template corner projected to infinity".to_string(),
        });
    }

    let xmin = projected.iter().map(|p| p.0).fold(f64::INFINITY, f64::min) as i64;
    let ymin = projected.iter().map(|p| p.1).fold(f64::INFINITY, f64::min) as i64;
    let xmax = projected
        .iter()
        .map(|p| p.0)
        .fold(f64::NEG_INFINITY, f64::max) as i64;
    let ymax = projected
        .iter()
        .map(|p| p.1)
        .fold(f64::NEG_INFINITY, f64::max) as i64;

    let center_x = (xmin + xmax) as f64 / 2.0;
    let center_y = (ymin + ymax) as f64 / 2.0;
    let crop_height = ymax - ymin;
    let crop_width = crop_height as f64 * aspect;

    let x1 = (center_x - crop_width / 2.0) as i64;
    let y1 = (center_y - crop_height as f64 / 2.0) as i64;
    let x2 = (x1 as f64 + crop_width) as i64;
    let y2 = y1 + crop_height;

    let x1 = x1.max(0);
    let y1 = y1.max(0);
    let x2 = x2.min(target_width as i64);
    let y2 = y2.min(target_height as i64);

    if x2 <= x1 || y2 <= y1 {
        return Err(FeatCropError::DegenerateCrop {
            width: target_width,
            height: target_height,
        });
    }

    let crop = CropBox {
        x1: x1 as u32,
        y1: y1 as u32,
        x2: x2 as u32,
        y2: y2 as u32,
    };
    trace_event!("crop_resolved", width = crop.width(), height = crop.height());
    Ok(crop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    fn translation(tx: f64, ty: f64) -> Homography {
        Homography::from_matrix(Matrix3::new(
            1.0, 0.0, tx, //
            0.0, 1.0, ty, //
            0.0, 0.0, 1.0,
        ))
    }

    #[test]
    fn centered_crop_keeps_the_projected_height() {
        // 200x300 template translated to (1000, 2000) in a 4000x6000 photo.
        let crop = resolve_crop(&translation(1000.0, 2000.0), 200, 300, 4000, 6000, 456.0 / 564.0)
            .unwrap();

        assert_eq!(crop.height(), 300);
        // Width derived from height and aspect, not from the box.
        let expected_width = (300.0 * 456.0 / 564.0) as i64;
        assert!((crop.width() as i64 - expected_width).abs() <= 1);
        // Centered on the projected template.
        assert_eq!((crop.y1 + crop.y2) / 2, 2150);
    }

    #[test]
    fn aspect_holds_within_one_pixel() {
        for (tw, th) in [(456u32, 564u32), (100, 100), (320, 200)] {
            let aspect = tw as f64 / th as f64;
            let crop =
                resolve_crop(&translation(500.0, 700.0), 180, 260, 3000, 3000, aspect).unwrap();
            let derived = crop.height() as f64 * aspect;
            assert!(
                (crop.width() as f64 - derived).abs() <= 1.0,
                "aspect {aspect}: {}x{}",
                crop.width(),
                crop.height()
            );
        }
    }

    #[test]
    fn crop_is_clamped_to_the_image() {
        // Template lands partially above and left of the origin.
        let crop = resolve_crop(&translation(-50.0, -80.0), 200, 300, 1000, 800, 1.0).unwrap();

        assert_eq!(crop.x1, 0);
        assert_eq!(crop.y1, 0);
        assert!(crop.x2 <= 1000);
        assert!(crop.y2 <= 800);
    }

    #[test]
    fn crop_entirely_outside_the_image_degenerates() {
        let err = resolve_crop(&translation(5000.0, 5000.0), 200, 300, 1000, 800, 1.0).unwrap_err();
        assert_eq!(
            err,
            FeatCropError::DegenerateCrop {
                width: 1000,
                height: 800,
            }
        );
    }

    #[test]
    fn wide_aspect_grows_the_width_from_the_height() {
        let crop = resolve_crop(&translation(1000.0, 1000.0), 100, 100, 4000, 4000, 2.0).unwrap();
        assert_eq!(crop.height(), 100);
        assert_eq!(crop.width(), 200);
    }

    #[test]
    fn invalid_aspect_is_rejected() {
        let err = resolve_crop(&translation(0.0, 0.0), 10, 10, 100, 100, 0.0).unwrap_err();
        assert!(matches!(err, FeatCropError::Unexpected { .. }));
    }

    #[test]
    fn zero_sized_target_is_rejected() {
        let err = resolve_crop(&translation(0.0, 0.0), 10, 10, 0, 100, 1.0).unwrap_err();
        assert_eq!(
            err,
            FeatCropError::InvalidDimensions {
                width: 0,
                height: 100,
            }
        );
    }
}
