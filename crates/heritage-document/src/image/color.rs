// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input loading and colour canonicalization.
//
// Every image entering the pipeline goes through `load`, which accepts a file
// path, encoded bytes, a decoded image or a raw pixel buffer and produces one
// canonical representation: single-channel luma, or three-channel RGB. The
// recognition engines additionally need three channels, provided by
// `to_model_rgb`. Both the preprocessor and the orchestrator use these two
// functions, so channel handling cannot drift between them.

use std::path::{Path, PathBuf};

use heritage_core::error::{HeritageError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

/// Container formats accepted at the system boundary.
pub const SUPPORTED_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Tiff];

/// Order of the colour channels in a raw pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    /// Reversed order, as produced by many camera and capture libraries.
    Bgr,
}

/// An undecoded, interleaved 8-bit pixel buffer.
#[derive(Debug, Clone)]
pub struct RawPixels {
    pub width: u32,
    pub height: u32,
    /// 1 (luma), 3 (colour) or 4 (colour + alpha).
    pub channels: u8,
    /// Ignored for single-channel buffers.
    pub order: ChannelOrder,
    pub data: Vec<u8>,
}

impl RawPixels {
    pub fn new(width: u32, height: u32, channels: u8, order: ChannelOrder, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            order,
            data,
        }
    }

    /// Validate the buffer and convert it to the canonical representation.
    pub fn into_image(self) -> Result<DynamicImage> {
        let expected = (self.width as u64)
            .checked_mul(self.height as u64)
            .and_then(|px| px.checked_mul(self.channels as u64));
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(HeritageError::UnsupportedFormat(format!(
                "raw buffer with {} channels (expected 1, 3 or 4)",
                self.channels
            )));
        }
        if expected != Some(self.data.len() as u64) {
            return Err(HeritageError::UnsupportedFormat(format!(
                "raw buffer of {} bytes does not match {}x{}x{}",
                self.data.len(),
                self.width,
                self.height,
                self.channels
            )));
        }

        let (width, height) = (self.width, self.height);
        let mismatch = || {
            HeritageError::UnsupportedFormat(format!("raw buffer rejected for {width}x{height}"))
        };

        if self.channels == 1 {
            return GrayImage::from_raw(width, height, self.data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(mismatch);
        }

        let stride = self.channels as usize;
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for px in self.data.chunks_exact(stride) {
            match self.order {
                ChannelOrder::Rgb => rgb.extend_from_slice(&[px[0], px[1], px[2]]),
                ChannelOrder::Bgr => rgb.extend_from_slice(&[px[2], px[1], px[0]]),
            }
        }
        RgbImage::from_raw(width, height, rgb)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(mismatch)
    }
}

/// The forms in which a page image can enter the pipeline.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// A JPEG, PNG or TIFF file on disk.
    Path(PathBuf),
    /// The encoded content of a JPEG, PNG or TIFF file (e.g. an upload).
    Encoded(Vec<u8>),
    /// An image already decoded by the caller.
    Decoded(DynamicImage),
    /// A raw interleaved pixel buffer.
    Raw(RawPixels),
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        Self::Decoded(image)
    }
}

impl From<RawPixels> for ImageInput {
    fn from(raw: RawPixels) -> Self {
        Self::Raw(raw)
    }
}

/// Normalize any [`ImageInput`] into the canonical representation.
#[instrument(skip_all)]
pub fn load(input: ImageInput) -> Result<DynamicImage> {
    let image = match input {
        ImageInput::Path(path) => {
            let bytes = std::fs::read(&path)?;
            decode(&bytes, &path.display().to_string())?
        }
        ImageInput::Encoded(bytes) => decode(&bytes, "encoded buffer")?,
        ImageInput::Decoded(image) => image,
        ImageInput::Raw(raw) => raw.into_image()?,
    };
    let image = canonicalize(image);
    debug!(
        width = image.width(),
        height = image.height(),
        channels = channel_count(&image),
        "Input normalized"
    );
    Ok(image)
}

/// Decode JPEG, PNG or TIFF content, detected from its magic bytes.
pub fn decode(bytes: &[u8], origin: &str) -> Result<DynamicImage> {
    let format = image::guess_format(bytes).map_err(|err| {
        HeritageError::UnsupportedFormat(format!("{origin}: {err}"))
    })?;
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(HeritageError::UnsupportedFormat(format!(
            "{origin}: {format:?} is not JPEG, PNG or TIFF"
        )));
    }
    image::load_from_memory_with_format(bytes, format).map_err(|err| {
        HeritageError::ImageError(format!("failed to decode {origin}: {err}"))
    })
}

/// Collapse any pixel layout to 8-bit luma (no colour) or 8-bit RGB.
///
/// Alpha is dropped and higher bit depths are reduced.
pub fn canonicalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        other if !other.color().has_color() => DynamicImage::ImageLuma8(other.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Three-channel RGB as expected by the recognition engines. Luma is
/// replicated into all three channels.
pub fn to_model_rgb(image: &DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other => other.to_rgb8(),
    }
}

/// Number of channels in the image's pixel layout.
pub fn channel_count(image: &DynamicImage) -> u8 {
    image.color().channel_count()
}
