// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Heritage OCR pipeline: page geometry, the
// block → line → word recognition hierarchy, and the assembled result.

use serde::{Deserialize, Serialize};

/// A bounding region in page-relative units.
///
/// Both corners are normalised to `0.0..=1.0` of the page width/height, so a
/// geometry stays valid regardless of the resolution the page was recognised
/// at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Geometry {
    /// Build a geometry from two opposite corners, ordering and clamping them.
    pub fn new(a: (f32, f32), b: (f32, f32)) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            x_min: clamp(a.0.min(b.0)),
            y_min: clamp(a.1.min(b.1)),
            x_max: clamp(a.0.max(b.0)),
            y_max: clamp(a.1.max(b.1)),
        }
    }

    /// Normalise a pixel rectangle (`left..right`, `top..bottom`) against the
    /// page dimensions.
    pub fn from_pixels(left: f32, top: f32, right: f32, bottom: f32, page_w: u32, page_h: u32) -> Self {
        let w = page_w.max(1) as f32;
        let h = page_h.max(1) as f32;
        Self::new((left / w, top / h), (right / w, bottom / h))
    }

    /// The whole page.
    pub fn full_page() -> Self {
        Self::new((0.0, 0.0), (1.0, 1.0))
    }

    /// Smallest geometry containing both `self` and `other`.
    pub fn union(&self, other: &Geometry) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Corners as `((x_min, y_min), (x_max, y_max))`.
    pub fn corners(&self) -> ((f32, f32), (f32, f32)) {
        ((self.x_min, self.y_min), (self.x_max, self.y_max))
    }
}

/// A single recognised word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    /// Engine-reported probability in `[0, 1]`; `None` when the engine does
    /// not report one. Never synthesised.
    pub confidence: Option<f32>,
    pub geometry: Geometry,
}

impl RecognizedWord {
    pub fn new(text: impl Into<String>, confidence: Option<f32>, geometry: Geometry) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.filter(|c| c.is_finite()).map(|c| c.clamp(0.0, 1.0)),
            geometry,
        }
    }
}

/// Words of one text line, in reading order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub words: Vec<RecognizedWord>,
}

impl RecognizedLine {
    pub fn new(words: Vec<RecognizedWord>) -> Self {
        Self { words }
    }

    /// Words joined by a single space.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Union of the word geometries, if the line has any words.
    pub fn geometry(&self) -> Option<Geometry> {
        self.words
            .iter()
            .map(|w| w.geometry)
            .reduce(|a, b| a.union(&b))
    }
}

/// A layout block: a region holding consecutive lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedBlock {
    pub geometry: Geometry,
    pub lines: Vec<RecognizedLine>,
}

impl RecognizedBlock {
    /// Build a block whose geometry is the union of its words. A block with no
    /// words gets a zero-sized geometry at the origin.
    pub fn from_lines(lines: Vec<RecognizedLine>) -> Self {
        let geometry = lines
            .iter()
            .filter_map(RecognizedLine::geometry)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Geometry::new((0.0, 0.0), (0.0, 0.0)));
        Self { geometry, lines }
    }
}

/// Which recogniser produced an [`OcrResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionMethod {
    /// The deep-learning detector + recogniser.
    Primary,
    /// The classical, script-broad whole-page recogniser.
    Fallback,
}

impl std::fmt::Display for RecognitionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        })
    }
}

/// Text extracted from one page.
///
/// `full_text` is always the block → line → word replay of `blocks` for a
/// primary result (lines joined by `\n`, words by a single space). A fallback
/// result carries flat text only: `blocks` and `words` are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub full_text: String,
    pub blocks: Vec<RecognizedBlock>,
    /// Flat view of every word in reading order.
    pub words: Vec<RecognizedWord>,
    pub method: Option<RecognitionMethod>,
}

impl OcrResult {
    /// Assemble a result from detected blocks, preserving their order.
    pub fn from_blocks(blocks: Vec<RecognizedBlock>, method: RecognitionMethod) -> Self {
        let full_text = join_blocks(&blocks);
        let words = blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .flat_map(|l| l.words.iter().cloned())
            .collect();
        Self {
            full_text,
            blocks,
            words,
            method: Some(method),
        }
    }

    /// Wrap flat text from the whole-page fallback recogniser.
    ///
    /// Trailing whitespace on each line and trailing blank lines are removed;
    /// classical engines typically terminate their output with form feeds.
    pub fn from_fallback_text(text: &str) -> Self {
        let full_text = text
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_owned();
        Self {
            full_text,
            blocks: Vec::new(),
            words: Vec::new(),
            method: Some(RecognitionMethod::Fallback),
        }
    }

    /// Whether any non-whitespace text was extracted.
    pub fn has_text(&self) -> bool {
        !self.full_text.trim().is_empty()
    }

    /// Number of lines across all blocks.
    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(|b| b.lines.len()).sum()
    }

    /// Mean of the engine-reported word confidences, if any were reported.
    pub fn mean_confidence(&self) -> Option<f32> {
        let reported: Vec<f32> = self.words.iter().filter_map(|w| w.confidence).collect();
        if reported.is_empty() {
            None
        } else {
            Some(reported.iter().sum::<f32>() / reported.len() as f32)
        }
    }

    /// Serialize to the JSON record handed to downstream consumers.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Replay the block → line → word order into plain text.
pub fn join_blocks(blocks: &[RecognizedBlock]) -> String {
    blocks
        .iter()
        .flat_map(|b| b.lines.iter())
        .map(RecognizedLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Named image variants produced by one preprocessing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageVariant {
    Original,
    Denoised,
    Deskewed,
    Enhanced,
    Binary,
}

impl ImageVariant {
    /// Every variant, in pipeline order.
    pub const ALL: [ImageVariant; 5] = [
        Self::Original,
        Self::Denoised,
        Self::Deskewed,
        Self::Enhanced,
        Self::Binary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Denoised => "denoised",
            Self::Deskewed => "deskewed",
            Self::Enhanced => "enhanced",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for ImageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageVariant {
    type Err = crate::error::HeritageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                crate::error::HeritageError::InvalidConfig(format!("unknown image variant: {s}"))
            })
    }
}
