// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive (local) binarization with a Gaussian-weighted neighbourhood mean.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::definitions::Image;
use imageproc::filter::separable_filter_equal;
use tracing::{debug, instrument, warn};

use crate::image::raster::to_grayscale;

/// Binarize the grayscale form of `image`.
///
/// A pixel becomes white (255) when it is brighter than the Gaussian-weighted
/// mean of its `block_size` × `block_size` neighbourhood minus `c`, and black
/// (0) otherwise. The output only ever holds those two values.
///
/// An image that already holds only 0 and 255 is returned unchanged, so
/// binarizing twice gives the same result as binarizing once.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn binarize(image: &DynamicImage, block_size: u32, c: f32) -> GrayImage {
    let gray = to_grayscale(image);
    if is_two_level(&gray) {
        debug!("Image is already two-level; binarization skipped");
        return gray;
    }
    adaptive_threshold(&gray, block_size, c)
}

/// Whether every pixel is either 0 or 255.
pub fn is_two_level(gray: &GrayImage) -> bool {
    gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
}

/// Gaussian adaptive threshold. `block_size` is coerced to an odd value of
/// at least 3.
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let block = odd_block_size(block_size);
    let mean = gaussian_local_mean(gray, block);

    let mut out = GrayImage::new(gray.width(), gray.height());
    for ((dst, src), local) in out.pixels_mut().zip(gray.pixels()).zip(mean.pixels()) {
        let threshold = f32::from(local.0[0]) - c;
        *dst = Luma([if f32::from(src.0[0]) > threshold { 255 } else { 0 }]);
    }
    debug!(block, c, "Adaptive threshold applied");
    out
}

fn odd_block_size(block_size: u32) -> u32 {
    let coerced = (block_size.max(3)) | 1;
    if coerced != block_size {
        warn!(requested = block_size, used = coerced, "Block size must be odd and at least 3");
    }
    coerced
}

/// Normalized 1-D Gaussian of length `size`, with the sigma conventionally
/// derived from the kernel size.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Gaussian-weighted local mean, rounded back to 8 bits.
///
/// The blur runs on an `f32` copy so the horizontal pass is not truncated
/// before the vertical one. Borders are padded by continuity.
fn gaussian_local_mean(gray: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let plane: Image<Luma<f32>> = ImageBuffer::from_fn(w, h, |x, y| Luma([f32::from(gray.get_pixel(x, y).0[0])]));
    let blurred = separable_filter_equal(&plane, &gaussian_kernel(size));
    GrayImage::from_fn(w, h, |x, y| {
        Luma([blurred.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8])
    })
}
