// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the preprocessing stages on a small synthetic
// ledger page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use heritage_core::PreprocessConfig;
use heritage_document::Preprocessor;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 160x120 page with six ruled text-like bars, turned 7 degrees.
fn skewed_page() -> DynamicImage {
    let mut img = GrayImage::from_pixel(160, 120, Luma([225u8]));
    for row in 0..6u32 {
        let y0 = 20 + row * 14;
        for y in y0..y0 + 4 {
            for x in 20..140 {
                img.put_pixel(x, y, Luma([35u8]));
            }
        }
    }
    let turned = rotate_about_center(&img, 7f32.to_radians(), Interpolation::Bilinear, Luma([225u8]));
    DynamicImage::ImageLuma8(turned)
}

/// 1200x1600 colour photo of a ledger page with mild sensor noise, about
/// the size of a phone scan downsampled for recognition.
fn photographed_page() -> DynamicImage {
    let page = RgbImage::from_fn(1200, 1600, |x, y| {
        let noise = ((x * 31 + y * 17) % 11) as u8;
        if y % 48 < 6 && (100..1100).contains(&x) {
            Rgb([40 + noise, 38 + noise, 45 + noise])
        } else {
            Rgb([215 + noise, 205 + noise, 185 + noise])
        }
    });
    DynamicImage::ImageRgb8(page)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_stages(c: &mut Criterion) {
    let page = skewed_page();
    let pre = Preprocessor::default();

    c.bench_function("denoise (160x120)", |b| {
        b.iter(|| black_box(pre.denoise(black_box(&page))));
    });
    c.bench_function("deskew (160x120)", |b| {
        b.iter(|| black_box(pre.deskew(black_box(&page))));
    });
    c.bench_function("enhance_contrast (160x120)", |b| {
        b.iter(|| black_box(pre.enhance_contrast(black_box(&page))));
    });
    c.bench_function("binarize (160x120)", |b| {
        b.iter(|| black_box(pre.binarize(black_box(&page))));
    });
}

/// Whole pipeline with the smaller denoise windows used for previews.
fn bench_pipeline(c: &mut Criterion) {
    let page = skewed_page();
    let pre = Preprocessor::new(PreprocessConfig {
        denoise_template_window: 5,
        denoise_search_window: 11,
        ..Default::default()
    })
    .expect("preview config must validate");

    c.bench_function("run_pipeline preview (160x120)", |b| {
        b.iter(|| black_box(pre.run_pipeline(black_box(page.clone()))));
    });
}

/// Default denoise settings on a realistic page size.
fn bench_denoise_page(c: &mut Criterion) {
    let page = photographed_page();
    let pre = Preprocessor::default();

    let mut group = c.benchmark_group("denoise_page");
    group.sample_size(10);
    group.bench_function("denoise rgb (1200x1600)", |b| {
        b.iter(|| black_box(pre.denoise(black_box(&page))));
    });
    group.finish();
}

criterion_group!(benches, bench_stages, bench_pipeline, bench_denoise_page);
criterion_main!(benches);
