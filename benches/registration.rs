use criterion::{criterion_group, criterion_main, Criterion};
use featcrop::{detect_and_describe, match_descriptors, DetectorConfig, ImageSide};
use image::{GrayImage, Luma};
use std::hint::black_box;

fn make_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        Luma([((x * 13) ^ (y * 7) ^ (x * y)) as u8])
    })
}

fn extract_patch(image: &GrayImage, x0: u32, y0: u32, width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| *image.get_pixel(x0 + x, y0 + y))
}

fn bench_detection(c: &mut Criterion) {
    let image = make_image(512, 512);
    let cfg = DetectorConfig::default();

    c.bench_function("detect_and_describe_512", |b| {
        b.iter(|| detect_and_describe(black_box(&image), &cfg, ImageSide::Target).unwrap())
    });
}

fn bench_matching(c: &mut Criterion) {
    let image = make_image(512, 512);
    let template = extract_patch(&image, 120, 90, 96, 72);
    let cfg = DetectorConfig::default();

    let (template_kps, template_desc) =
        detect_and_describe(&template, &cfg, ImageSide::Template).unwrap();
    let (target_kps, target_desc) = detect_and_describe(&image, &cfg, ImageSide::Target).unwrap();

    c.bench_function("match_descriptors", |b| {
        b.iter(|| {
            match_descriptors(
                black_box(&template_kps),
                black_box(&template_desc),
                &target_kps,
                &target_desc,
            )
        })
    });
}

criterion_group!(benches, bench_detection, bench_matching);
criterion_main!(benches);
