// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization (CLAHE).

use image::{DynamicImage, GrayImage, Luma, imageops};
use imageproc::stats::histogram;
use tracing::{debug, instrument, warn};

use crate::image::raster::to_grayscale;

/// Equalize the grayscale form of `image` tile by tile.
///
/// `clip_limit` bounds how strongly any single intensity may be amplified
/// (relative to a flat histogram); `0` disables clipping. `tile_grid` is
/// `(columns, rows)`. Output is single-channel with the input's dimensions.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn enhance_contrast(image: &DynamicImage, clip_limit: f32, tile_grid: (u32, u32)) -> GrayImage {
    clahe(&to_grayscale(image), clip_limit, tile_grid)
}

/// CLAHE over a single-channel image.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tile_grid: (u32, u32)) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    // Never more tiles than pixels along an axis.
    let grid_x = tile_grid.0.clamp(1, w);
    let grid_y = tile_grid.1.clamp(1, h);
    if (grid_x, grid_y) != tile_grid {
        warn!(?tile_grid, grid_x, grid_y, "Tile grid reduced to fit image");
    }
    let tile_w = w.div_ceil(grid_x);
    let tile_h = h.div_ceil(grid_y);
    debug!(tile_w, tile_h, clip_limit, "CLAHE tiles");

    // Every tile covers the same area; sizes that do not divide by the grid
    // are padded by mirroring the edges.
    let padded = reflect_pad(gray, tile_w * grid_x, tile_h * grid_y);
    let mut luts = Vec::with_capacity((grid_x * grid_y) as usize);
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            let tile = imageops::crop_imm(&padded, tx * tile_w, ty * tile_h, tile_w, tile_h).to_image();
            luts.push(tile_lut(&tile, clip_limit));
        }
    }
    let lut = |tx: u32, ty: u32| &luts[(ty * grid_x + tx) as usize];

    GrayImage::from_fn(w, h, |x, y| {
        let (tx1, tx2, xa) = neighbours(x, tile_w, grid_x);
        let (ty1, ty2, ya) = neighbours(y, tile_h, grid_y);
        let v = gray.get_pixel(x, y).0[0] as usize;
        let top = f32::from(lut(tx1, ty1)[v]) * (1.0 - xa) + f32::from(lut(tx2, ty1)[v]) * xa;
        let bottom = f32::from(lut(tx1, ty2)[v]) * (1.0 - xa) + f32::from(lut(tx2, ty2)[v]) * xa;
        Luma([(top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8])
    })
}

/// The two tile centres bracketing `pos` along one axis and the
/// interpolation weight of the second.
fn neighbours(pos: u32, tile: u32, grid: u32) -> (u32, u32, f32) {
    let f = pos as f32 / tile as f32 - 0.5;
    let first = f.floor();
    let weight = f - first;
    let lo = first.max(0.0) as u32;
    let hi = ((first + 1.0).max(0.0) as u32).min(grid - 1);
    (lo.min(grid - 1), hi, weight)
}

/// Extend `gray` to `width` × `height`, mirroring about the last row and
/// column without repeating them. The extension must be shorter than the
/// image along each axis.
fn reflect_pad(gray: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if (w, h) == (width, height) {
        return gray.clone();
    }
    let mirror = |i: u32, len: u32| if i < len { i } else { (2 * (len - 1)).saturating_sub(i) };
    GrayImage::from_fn(width, height, |x, y| *gray.get_pixel(mirror(x, w), mirror(y, h)))
}

/// Clipped-histogram equalization lookup table for one tile.
fn tile_lut(tile: &GrayImage, clip_limit: f32) -> [u8; 256] {
    let mut hist = histogram(tile).channels[0];
    let area = tile.width() * tile.height();

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        clip_histogram(&mut hist, limit);
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (i, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[i] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Cap every bin at `limit` and spread the excess evenly over all bins; the
/// indivisible remainder goes one count at a time to evenly spaced bins.
/// The histogram total is unchanged.
pub fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / 256;
    let mut residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}
