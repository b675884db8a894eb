// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition engine seams.

use heritage_core::RecognizedBlock;
use heritage_core::error::Result;
use image::RgbImage;

/// A detector + recogniser producing the full block → line → word hierarchy.
///
/// Implementations hold their loaded model weights and are shared read-only
/// (behind an `Arc`) across documents. Input is always 8-bit RGB.
pub trait PrimaryEngine: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Recognise one page. Blocks must be returned in reading order; nothing
    /// downstream reorders them.
    fn recognize_page(&self, image: &RgbImage) -> Result<Vec<RecognizedBlock>>;
}

/// A whole-page recogniser that returns flat text only.
pub trait FallbackEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Recognise one page as plain text. `language_hint` is an engine-specific
    /// language list such as `eng+hin`.
    fn recognize_text(&self, image: &RgbImage, language_hint: &str) -> Result<String>;
}
