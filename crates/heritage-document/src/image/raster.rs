// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster helpers: grayscale collapse, size-preserving rotation with edge
// replication, PNG encoding. Every function returns a new buffer; inputs are
// never modified.

use heritage_core::error::{HeritageError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Pixel};
use tracing::{debug, instrument};

/// Collapse an image to a single luma channel. Already single-channel images
/// are copied unchanged.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

/// Rotate an image about its centre by `degrees`, clockwise on screen.
///
/// The output keeps the input's dimensions and pixel layout. Samples are
/// taken with bicubic interpolation; positions outside the source replicate
/// the nearest edge pixel, so no artificial border is introduced.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn rotate_about_center(image: &DynamicImage, degrees: f32) -> DynamicImage {
    if degrees == 0.0 || !degrees.is_finite() {
        return image.clone();
    }

    let rotated = match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(rotate_buffer(buf, degrees)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(rotate_buffer(buf, degrees)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(rotate_buffer(buf, degrees)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(rotate_buffer(buf, degrees)),
        other => DynamicImage::ImageRgb8(rotate_buffer(&other.to_rgb8(), degrees)),
    };
    debug!(degrees, "Rotation applied");
    rotated
}

fn rotate_buffer<P>(src: &ImageBuffer<P, Vec<u8>>, degrees: f32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = src.dimensions();
    let mut out = ImageBuffer::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;
    let channels = P::CHANNEL_COUNT as usize;
    let mut sample = [0u8; 4];

    for y in 0..h {
        for x in 0..w {
            // Inverse mapping: where in the source does this output pixel come from?
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let sx = cx + dx * cos + dy * sin;
            let sy = cy - dx * sin + dy * cos;
            sample_bicubic(src, sx, sy, &mut sample[..channels]);
            out.put_pixel(x, y, *P::from_slice(&sample[..channels]));
        }
    }
    out
}

/// Bicubic sample at a fractional position, clamping the 4x4 neighbourhood
/// into the image.
fn sample_bicubic<P>(src: &ImageBuffer<P, Vec<u8>>, x: f32, y: f32, out: &mut [u8])
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = src.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let wx = cubic_weights(fx);
    let wy = cubic_weights(fy);

    let clamp_x = |i: i64| i.clamp(0, w as i64 - 1) as u32;
    let clamp_y = |j: i64| j.clamp(0, h as i64 - 1) as u32;

    let mut acc = [0f32; 4];
    for (j, weight_y) in wy.iter().enumerate() {
        let sy = clamp_y(y0 as i64 + j as i64 - 1);
        for (i, weight_x) in wx.iter().enumerate() {
            let sx = clamp_x(x0 as i64 + i as i64 - 1);
            let weight = weight_x * weight_y;
            let px = src.get_pixel(sx, sy).channels();
            for (c, slot) in acc.iter_mut().take(out.len()).enumerate() {
                *slot += weight * px[c] as f32;
            }
        }
    }
    for (c, value) in out.iter_mut().enumerate() {
        *value = acc[c].round().clamp(0.0, 255.0) as u8;
    }
}

/// Weights of the four taps at offsets -1, 0, 1, 2 for fractional position `t`.
fn cubic_weights(t: f32) -> [f32; 4] {
    [
        cubic_kernel(t + 1.0),
        cubic_kernel(t),
        cubic_kernel(1.0 - t),
        cubic_kernel(2.0 - t),
    ]
}

/// Keys cubic convolution kernel with a = -0.75.
fn cubic_kernel(t: f32) -> f32 {
    const A: f32 = -0.75;
    let t = t.abs();
    if t <= 1.0 {
        (A + 2.0) * t * t * t - (A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        A * t * t * t - 5.0 * A * t * t + 8.0 * A * t - 4.0 * A
    } else {
        0.0
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    encode_to_format(image, ImageFormat::Png)
}

/// Write the image to a file. The format is inferred from the file extension.
pub fn save(image: &DynamicImage, path: impl AsRef<std::path::Path>) -> Result<()> {
    image.save(path.as_ref()).map_err(|err| {
        HeritageError::ImageError(format!(
            "failed to save image to {}: {}",
            path.as_ref().display(),
            err
        ))
    })
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| HeritageError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
