//! Crop extraction and fixed-size resampling.

use image::imageops::FilterType;
use image::DynamicImage;

use crate::crop::CropBox;
use crate::util::{FeatCropError, FeatCropResult};

/// Rendered outputs of one registered pair. Holds the crop at native
/// resolution and, when requested, its fixed-size resampling.
#[derive(Debug)]
pub struct RenderedCrops {
    /// Crop at the target image's native pixel density.
    pub high_res: DynamicImage,
    /// Crop resampled to the exact requested dimensions.
    pub fixed: Option<DynamicImage>,
}

/// Extracts `crop` from `target` and optionally resamples it to
/// `fixed` dimensions with a Lanczos3 kernel.
///
/// The fixed output lands on the requested dimensions exactly; there
/// is no rounding drift regardless of the crop's own size.
pub fn render(
    target: &DynamicImage,
    crop: CropBox,
    fixed: Option<(u32, u32)>,
) -> FeatCropResult<RenderedCrops> {
    if crop.x1 >= crop.x2
        || crop.y1 >= crop.y2
        || crop.x2 > target.width()
        || crop.y2 > target.height()
    {
        return Err(FeatCropError::Unexpected {
            reason: format!(
                "crop box ({}, {})-({}, {}) does not fit a {}x{} image",
                crop.x1,
                crop.y1,
                crop.x2,
                crop.y2,
                target.width(),
                target.height()
            ),
        });
    }

    let high_res = target.crop_imm(crop.x1, crop.y1, crop.width(), crop.height());
    let fixed = fixed.map(|(width, height)| high_res.resize_exact(width, height, FilterType::Lanczos3));
    Ok(RenderedCrops { high_res, fixed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(200, 150, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn high_res_crop_matches_the_box() {
        let crop = CropBox {
            x1: 20,
            y1: 30,
            x2: 120,
            y2: 110,
        };
        let rendered = render(&photo(), crop, None).unwrap();

        assert_eq!(rendered.high_res.width(), 100);
        assert_eq!(rendered.high_res.height(), 80);
        assert!(rendered.fixed.is_none());
    }

    #[test]
    fn fixed_output_has_exact_dimensions() {
        let crop = CropBox {
            x1: 0,
            y1: 0,
            x2: 77,
            y2: 133,
        };
        let rendered = render(&photo(), crop, Some((456, 564))).unwrap();

        let fixed = rendered.fixed.unwrap();
        assert_eq!((fixed.width(), fixed.height()), (456, 564));
    }

    #[test]
    fn crop_content_comes_from_the_right_region() {
        let crop = CropBox {
            x1: 50,
            y1: 40,
            x2: 60,
            y2: 50,
        };
        let rendered = render(&photo(), crop, None).unwrap();
        let rgb = rendered.high_res.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([50, 40, 90]));
    }

    #[test]
    fn out_of_range_boxes_are_rejected() {
        let crop = CropBox {
            x1: 150,
            y1: 100,
            x2: 250,
            y2: 160,
        };
        let err = render(&photo(), crop, None).unwrap_err();
        assert!(matches!(err, FeatCropError::Unexpected { .. }));
    }
}
