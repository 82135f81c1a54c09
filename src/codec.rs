//! Image decode/encode tolerant of arbitrary path encodings.
//!
//! Files are read as raw bytes and decoded from memory; outputs are
//! encoded into a memory buffer before the bytes hit the filesystem.
//! The codecs therefore never see the filesystem path itself, which
//! keeps non-UTF-8 and platform-specific path encodings working.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat};

use crate::util::{FeatCropError, FeatCropResult};

/// Loads and decodes the image at `path`.
///
/// Undecodable or unreadable streams produce
/// [`FeatCropError::Decode`]; this function never panics on bad input.
pub fn load(path: &Path) -> FeatCropResult<DynamicImage> {
    let bytes = fs::read(path).map_err(|err| FeatCropError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    image::load_from_memory(&bytes).map_err(|err| FeatCropError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Encodes `img` and writes it to `path`, overwriting any existing file.
///
/// The format is inferred from the path extension; a missing or
/// unrecognized extension falls back to PNG so the output stays
/// lossless.
pub fn save(path: &Path, img: &DynamicImage) -> FeatCropResult<()> {
    let format = path
        .extension()
        .and_then(ImageFormat::from_extension)
        .unwrap_or(ImageFormat::Png);
    let mut encoded = Cursor::new(Vec::new());
    img.write_to(&mut encoded, format)
        .map_err(|err| FeatCropError::Write {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    fs::write(path, encoded.into_inner()).map_err(|err| FeatCropError::Write {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Converts a decoded image to single-channel intensity.
///
/// An alpha channel is discarded before the conversion — transparency
/// is never blended into the luminance.
pub fn to_gray(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("featcrop-codec-{}-{name}", std::process::id()))
    }

    #[test]
    fn save_then_load_roundtrips_dimensions() {
        let mut img = RgbImage::new(12, 9);
        img.put_pixel(3, 4, Rgb([200, 10, 10]));
        let path = temp_path("roundtrip.png");
        save(&path, &DynamicImage::ImageRgb8(img)).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (12, 9));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_without_extension_defaults_to_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let path = temp_path("noext");
        save(&path, &img).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_undecodable_bytes() {
        let path = temp_path("garbage.png");
        fs::write(&path, b"definitely not an image").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, FeatCropError::Decode { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_reports_missing_file_as_decode_failure() {
        let err = load(Path::new("/nonexistent/featcrop/missing.png")).unwrap_err();
        assert!(matches!(err, FeatCropError::Decode { .. }));
    }

    #[test]
    fn gray_conversion_ignores_alpha() {
        let mut opaque = RgbaImage::new(1, 1);
        opaque.put_pixel(0, 0, Rgba([120, 60, 200, 255]));
        let mut transparent = RgbaImage::new(1, 1);
        transparent.put_pixel(0, 0, Rgba([120, 60, 200, 0]));

        let a = to_gray(&DynamicImage::ImageRgba8(opaque));
        let b = to_gray(&DynamicImage::ImageRgba8(transparent));
        assert_eq!(a.get_pixel(0, 0), b.get_pixel(0, 0));
    }
}
