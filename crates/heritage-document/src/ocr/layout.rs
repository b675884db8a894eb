// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grouping of recognised lines (in pixel coordinates) into layout blocks
// with page-relative geometry.

use heritage_core::{Geometry, RecognizedBlock, RecognizedLine, RecognizedWord};

/// Vertical gap, in multiples of the previous line's height, that starts a
/// new block.
pub const BLOCK_GAP_FACTOR: f32 = 1.0;

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn union(&self, other: &PixelRect) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    fn overlaps_horizontally(&self, other: &PixelRect) -> bool {
        self.left <= other.right && other.left <= self.right
    }
}

/// A recognised word before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    pub text: String,
    pub confidence: Option<f32>,
    pub rect: PixelRect,
}

/// The words of one detected line, in reading order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineBox {
    pub words: Vec<WordBox>,
}

impl LineBox {
    pub fn rect(&self) -> Option<PixelRect> {
        self.words.iter().map(|w| w.rect).reduce(|a, b| a.union(&b))
    }
}

/// Split lines (already in reading order) into blocks.
///
/// A new block starts when a line is separated from the previous one by more
/// than [`BLOCK_GAP_FACTOR`] line heights, or does not overlap it
/// horizontally. Line order is kept; lines without words are dropped.
pub fn group_into_blocks(lines: Vec<LineBox>, page_width: u32, page_height: u32) -> Vec<RecognizedBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<RecognizedLine> = Vec::new();
    let mut previous: Option<PixelRect> = None;

    for line in lines {
        let Some(rect) = line.rect() else {
            continue;
        };

        if let Some(prev) = previous {
            let gap = rect.top - prev.bottom;
            let separated = gap > prev.height().max(1.0) * BLOCK_GAP_FACTOR;
            if separated || !rect.overlaps_horizontally(&prev) {
                blocks.push(RecognizedBlock::from_lines(std::mem::take(&mut current)));
            }
        }

        let words = line
            .words
            .into_iter()
            .map(|w| {
                let geometry = Geometry::from_pixels(
                    w.rect.left,
                    w.rect.top,
                    w.rect.right,
                    w.rect.bottom,
                    page_width,
                    page_height,
                );
                RecognizedWord::new(w.text, w.confidence, geometry)
            })
            .collect();
        current.push(RecognizedLine::new(words));
        previous = Some(rect);
    }

    if !current.is_empty() {
        blocks.push(RecognizedBlock::from_lines(current));
    }
    blocks
}
