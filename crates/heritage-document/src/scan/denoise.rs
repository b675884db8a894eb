// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Non-local-means denoising.
//
// Each output pixel is a weighted mean of the pixels in a search window
// around it, weighted by how similar their surrounding patches (template
// windows) are. Patch distances are computed one search offset at a time
// with a summed-area table, so the cost per pixel does not depend on the
// template size.

use heritage_core::PreprocessConfig;
use image::{DynamicImage, GrayImage, Luma, RgbImage, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Parameters for [`denoise`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoiseParams {
    /// Filter strength for single-channel images and the luminance plane.
    pub strength: f32,
    /// Filter strength for the two chroma planes of colour images.
    pub color_strength: f32,
    /// Patch side (odd).
    pub template_window: u32,
    /// Search neighbourhood side (odd).
    pub search_window: u32,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self::from(&PreprocessConfig::default())
    }
}

impl From<&PreprocessConfig> for DenoiseParams {
    fn from(config: &PreprocessConfig) -> Self {
        Self {
            strength: config.denoise_strength,
            color_strength: config.denoise_color_strength,
            template_window: config.denoise_template_window,
            search_window: config.denoise_search_window,
        }
    }
}

/// Denoise an image, preserving its dimensions and pixel layout.
///
/// Single-channel images are filtered directly with `strength`. Colour
/// images are split into luminance and chroma planes; luminance is filtered
/// with `strength` and chroma with `color_strength`. Alpha is carried over
/// untouched.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn denoise(image: &DynamicImage, params: &DenoiseParams) -> DynamicImage {
    let filter = |plane: &GrayImage, h: f32| {
        nl_means_plane(plane, h, params.template_window, params.search_window)
    };

    let out = match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(filter(gray, params.strength)),
        DynamicImage::ImageRgba8(rgba) => {
            let rgb = DynamicImage::ImageRgba8(rgba.clone()).to_rgb8();
            let cleaned = denoise_rgb(&rgb, params, &filter);
            let mut out = RgbaImage::new(rgba.width(), rgba.height());
            for (x, y, px) in out.enumerate_pixels_mut() {
                let [r, g, b] = cleaned.get_pixel(x, y).0;
                px.0 = [r, g, b, rgba.get_pixel(x, y).0[3]];
            }
            DynamicImage::ImageRgba8(out)
        }
        other if !other.color().has_color() => {
            DynamicImage::ImageLuma8(filter(&other.to_luma8(), params.strength))
        }
        other => DynamicImage::ImageRgb8(denoise_rgb(&other.to_rgb8(), params, &filter)),
    };
    debug!(
        strength = params.strength,
        color_strength = params.color_strength,
        "Denoising complete"
    );
    out
}

fn denoise_rgb(
    rgb: &RgbImage,
    params: &DenoiseParams,
    filter: &dyn Fn(&GrayImage, f32) -> GrayImage,
) -> RgbImage {
    let [y, cb, cr] = split_ycbcr(rgb);
    let y = filter(&y, params.strength);
    let cb = filter(&cb, params.color_strength);
    let cr = filter(&cr, params.color_strength);
    merge_ycbcr(&y, &cb, &cr)
}

/// Full-range BT.601 luma/chroma split.
fn split_ycbcr(rgb: &RgbImage) -> [GrayImage; 3] {
    let (w, h) = rgb.dimensions();
    let mut planes = [GrayImage::new(w, h), GrayImage::new(w, h), GrayImage::new(w, h)];
    for (x, y, px) in rgb.enumerate_pixels() {
        let [r, g, b] = px.0.map(f32::from);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
        for (plane, value) in planes.iter_mut().zip([luma, cb, cr]) {
            plane.put_pixel(x, y, Luma([to_u8(value)]));
        }
    }
    planes
}

fn merge_ycbcr(y: &GrayImage, cb: &GrayImage, cr: &GrayImage) -> RgbImage {
    RgbImage::from_fn(y.width(), y.height(), |x, row| {
        let luma = f32::from(y.get_pixel(x, row).0[0]);
        let cb = f32::from(cb.get_pixel(x, row).0[0]) - 128.0;
        let cr = f32::from(cr.get_pixel(x, row).0[0]) - 128.0;
        image::Rgb([
            to_u8(luma + 1.402 * cr),
            to_u8(luma - 0.344_136 * cb - 0.714_136 * cr),
            to_u8(luma + 1.772 * cb),
        ])
    })
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Output rows filtered together. Each band builds its own summed-area
/// tables, so bands are independent and run in parallel.
const BAND_ROWS: usize = 32;

/// Exponents beyond this give weights below `f32` resolution next to the
/// centre pixel's weight of 1 and are skipped.
const MAX_EXPONENT: f32 = 30.0;

/// Non-local-means filter over one 8-bit plane.
///
/// Patch weights are `exp(-d / h²)` where `d` is the mean squared
/// difference between the two patches. Borders are handled by replicating
/// edge pixels. `h <= 0` returns the plane unchanged.
pub fn nl_means_plane(
    plane: &GrayImage,
    h: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (width, height) = plane.dimensions();
    if h <= 0.0 || !h.is_finite() || width == 0 || height == 0 {
        return plane.clone();
    }

    let t = (template_window / 2) as usize;
    let s = (search_window / 2) as usize;
    let (w, ht) = (width as usize, height as usize);
    let pad = s + t;
    let pw = w + 2 * pad;

    // Edge-replicated copy so every patch lookup stays in bounds.
    let raw = plane.as_raw();
    let padded: Vec<i32> = (0..ht + 2 * pad)
        .flat_map(|py| {
            let sy = py.saturating_sub(pad).min(ht - 1);
            (0..pw).map(move |px| {
                let sx = px.saturating_sub(pad).min(w - 1);
                i32::from(raw[sy * w + sx])
            })
        })
        .collect();

    let filter = BandFilter {
        padded: &padded,
        pw,
        w,
        t,
        s,
        area: ((2 * t + 1) * (2 * t + 1)) as f32,
        inv_h2: 1.0 / (h * h),
    };

    let mut out = vec![0u8; w * ht];
    out.par_chunks_mut(BAND_ROWS * w)
        .enumerate()
        .for_each(|(band, rows)| filter.run(band * BAND_ROWS, rows));

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| plane.clone())
}

/// Shared, read-only state for filtering one band of rows.
struct BandFilter<'a> {
    padded: &'a [i32],
    pw: usize,
    w: usize,
    t: usize,
    s: usize,
    area: f32,
    inv_h2: f32,
}

impl BandFilter<'_> {
    /// Filter output rows starting at `y0` into `out` (whole rows).
    fn run(&self, y0: usize, out: &mut [u8]) {
        let Self { padded, pw, w, t, s, area, inv_h2 } = *self;
        let rows = out.len() / w;
        let pad = s + t;

        // Squared differences are needed for every pixel plus a template radius.
        let rw = w + 2 * t;
        let rh = rows + 2 * t;
        let stride = rw + 1;
        let mut integral = vec![0u64; stride * (rh + 1)];

        let mut weight_sum = vec![0f32; rows * w];
        let mut value_sum = vec![0f32; rows * w];

        let span = s as isize;
        for dy in -span..=span {
            for dx in -span..=span {
                for ry in 0..rh {
                    let py = y0 + s + ry;
                    let qy = (py as isize + dy) as usize;
                    let mut row = 0u64;
                    for rx in 0..rw {
                        let px = s + rx;
                        let qx = (px as isize + dx) as usize;
                        let diff = padded[py * pw + px] - padded[qy * pw + qx];
                        row += (diff * diff) as u64;
                        integral[(ry + 1) * stride + rx + 1] = integral[ry * stride + rx + 1] + row;
                    }
                }

                for y in 0..rows {
                    for x in 0..w {
                        let (x2, y2) = (x + 2 * t + 1, y + 2 * t + 1);
                        let ssd = integral[y2 * stride + x2] + integral[y * stride + x]
                            - integral[y * stride + x2]
                            - integral[y2 * stride + x];
                        let exponent = ssd as f32 / area * inv_h2;
                        if exponent > MAX_EXPONENT {
                            continue;
                        }
                        let weight = (-exponent).exp();
                        let qx = ((pad + x) as isize + dx) as usize;
                        let qy = ((pad + y0 + y) as isize + dy) as usize;
                        let i = y * w + x;
                        weight_sum[i] += weight;
                        value_sum[i] += weight * padded[qy * pw + qx] as f32;
                    }
                }
            }
        }

        // The zero offset always contributes weight 1, so the sum is positive.
        for ((dst, value), weight) in out.iter_mut().zip(&value_sum).zip(&weight_sum) {
            *dst = (value / weight).round().clamp(0.0, 255.0) as u8;
        }
    }
}
