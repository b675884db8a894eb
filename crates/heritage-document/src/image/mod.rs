// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: input loading, colour canonicalization, and raster helpers
// (grayscale, rotation, encoding) shared by preprocessing and recognition.

pub mod color;
pub mod raster;

pub use color::{ChannelOrder, ImageInput, RawPixels, canonicalize, load, to_model_rgb};
pub use raster::{encode_png, rotate_about_center, to_grayscale};
