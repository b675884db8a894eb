// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan normalization: denoising, skew correction, localized contrast
// enhancement and adaptive binarization of photographed record pages.

pub mod binarize;
pub mod contrast;
pub mod denoise;
pub mod deskew;
pub mod preprocess;

pub use deskew::{Polarity, SkewEstimate};
pub use preprocess::{Preprocessor, ProcessedImageSet};
