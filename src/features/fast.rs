//! FAST-9 corner detection on grayscale images.
//!
//! A pixel is a corner when at least nine contiguous pixels on the
//! radius-3 Bresenham circle are all brighter or all darker than the
//! center by the threshold. A four-point cardinal pre-check rejects
//! most pixels before the full segment test runs.

use image::GrayImage;

use crate::features::Keypoint;

/// Offsets of the 16-pixel circle of radius 3, clockwise from north.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Contiguous run length on the circle that makes a corner.
const MIN_ARC: usize = 9;

/// Chebyshev radius for non-maximum suppression.
const NMS_RADIUS: f32 = 5.0;

/// Detects corners, suppresses non-maxima, and returns at most `cap`
/// keypoints ranked by response. Orientation is left at zero.
pub fn detect(img: &GrayImage, threshold: u8, cap: usize) -> Vec<Keypoint> {
    let (width, height) = img.dimensions();
    if width < 7 || height < 7 || cap == 0 {
        return Vec::new();
    }

    let mut corners = Vec::new();
    for y in 3..height - 3 {
        for x in 3..width - 3 {
            let center = img.get_pixel(x, y)[0];
            if !cardinal_pre_check(img, x, y, center, threshold) {
                continue;
            }
            if !segment_test(img, x, y, center, threshold) {
                continue;
            }
            corners.push(Keypoint {
                x: x as f32,
                y: y as f32,
                response: local_contrast(img, x, y),
                angle: 0.0,
            });
        }
    }
    suppress(corners, cap)
}

/// Checks the four cardinal circle pixels. Any nine-pixel run covers
/// at least two cardinals, so fewer than two on the same side rules a
/// corner out.
fn cardinal_pre_check(img: &GrayImage, x: u32, y: u32, center: u8, threshold: u8) -> bool {
    let bright = center.saturating_add(threshold);
    let dark = center.saturating_sub(threshold);
    let cardinals = [
        img.get_pixel(x, y - 3)[0],
        img.get_pixel(x + 3, y)[0],
        img.get_pixel(x, y + 3)[0],
        img.get_pixel(x - 3, y)[0],
    ];
    let brighter = cardinals.iter().filter(|&&p| p > bright).count();
    let darker = cardinals.iter().filter(|&&p| p < dark).count();
    brighter >= 2 || darker >= 2
}

/// Full segment test: walks the circle twice to handle runs that wrap
/// around the starting index.
fn segment_test(img: &GrayImage, x: u32, y: u32, center: u8, threshold: u8) -> bool {
    let bright = center.saturating_add(threshold);
    let dark = center.saturating_sub(threshold);

    let mut bright_run = 0usize;
    let mut dark_run = 0usize;
    for i in 0..CIRCLE.len() * 2 {
        let (dx, dy) = CIRCLE[i % CIRCLE.len()];
        let px = (x as i32 + dx) as u32;
        let py = (y as i32 + dy) as u32;
        let pixel = img.get_pixel(px, py)[0];

        if pixel > bright {
            bright_run += 1;
            dark_run = 0;
        } else if pixel < dark {
            dark_run += 1;
            bright_run = 0;
        } else {
            bright_run = 0;
            dark_run = 0;
        }
        if bright_run >= MIN_ARC || dark_run >= MIN_ARC {
            return true;
        }
    }
    false
}

/// Corner response: intensity standard deviation over the 5x5
/// neighborhood. Stronger local contrast ranks higher.
fn local_contrast(img: &GrayImage, x: u32, y: u32) -> f32 {
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let value = img.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0] as f32;
            sum += value;
            sum_sq += value * value;
        }
    }
    let mean = sum / 25.0;
    (sum_sq / 25.0 - mean * mean).max(0.0).sqrt()
}

/// Keeps the strongest corner within each Chebyshev neighborhood,
/// stopping once `cap` corners survive.
fn suppress(mut corners: Vec<Keypoint>, cap: usize) -> Vec<Keypoint> {
    corners.sort_by(|a, b| b.response.total_cmp(&a.response));

    let mut kept: Vec<Keypoint> = Vec::new();
    'outer: for corner in corners {
        for winner in &kept {
            let dist = (corner.x - winner.x).abs().max((corner.y - winner.y).abs());
            if dist <= NMS_RADIUS {
                continue 'outer;
            }
        }
        kept.push(corner);
        if kept.len() >= cap {
            break;
        }
    }
    kept
}
