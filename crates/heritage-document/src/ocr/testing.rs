// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory engines for exercising the orchestrator and the pipeline without
// model files.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use heritage_core::error::{HeritageError, Result};
use heritage_core::{Geometry, RecognizedBlock, RecognizedLine, RecognizedWord};
use image::RgbImage;

use crate::ocr::engine::{FallbackEngine, PrimaryEngine};

/// Returns the same blocks for every page and records what it was given.
#[derive(Debug, Default)]
pub struct StaticPrimaryEngine {
    blocks: Vec<RecognizedBlock>,
    calls: AtomicUsize,
    last_dimensions: Mutex<Option<(u32, u32)>>,
}

impl StaticPrimaryEngine {
    pub fn new(blocks: Vec<RecognizedBlock>) -> Self {
        Self {
            blocks,
            ..Default::default()
        }
    }

    /// An engine that never finds any text.
    pub fn empty() -> Self {
        Self::default()
    }

    /// One block holding `lines`, each a list of words, laid out top to
    /// bottom with confidence 0.9.
    pub fn with_lines(lines: &[&[&str]]) -> Self {
        let rows = lines.len().max(1) as f32;
        let lines = lines
            .iter()
            .enumerate()
            .map(|(row, words)| {
                let top = row as f32 / rows;
                let cols = words.len().max(1) as f32;
                RecognizedLine::new(
                    words
                        .iter()
                        .enumerate()
                        .map(|(col, text)| {
                            let left = col as f32 / cols;
                            let geometry = Geometry::new((left, top), (left + 0.9 / cols, top + 0.9 / rows));
                            RecognizedWord::new(*text, Some(0.9), geometry)
                        })
                        .collect(),
                )
            })
            .collect();
        Self::new(vec![RecognizedBlock::from_lines(lines)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dimensions of the most recent page.
    pub fn last_dimensions(&self) -> Option<(u32, u32)> {
        self.last_dimensions.lock().ok().and_then(|d| *d)
    }
}

impl PrimaryEngine for StaticPrimaryEngine {
    fn name(&self) -> &str {
        "static-primary"
    }

    fn recognize_page(&self, image: &RgbImage) -> Result<Vec<RecognizedBlock>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_dimensions.lock() {
            *last = Some(image.dimensions());
        }
        Ok(self.blocks.clone())
    }
}

/// Returns the same flat text for every page.
#[derive(Debug, Default)]
pub struct StaticFallbackEngine {
    text: String,
    calls: AtomicUsize,
    last_language: Mutex<Option<String>>,
}

impl StaticFallbackEngine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Language hint passed with the most recent page.
    pub fn last_language(&self) -> Option<String> {
        self.last_language.lock().ok().and_then(|l| l.clone())
    }
}

impl FallbackEngine for StaticFallbackEngine {
    fn name(&self) -> &str {
        "static-fallback"
    }

    fn recognize_text(&self, _image: &RgbImage, language_hint: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_language.lock() {
            *last = Some(language_hint.to_owned());
        }
        Ok(self.text.clone())
    }
}

/// Fails every call with a recognition error carrying `detail`.
#[derive(Debug, Clone)]
pub struct FailingEngine {
    detail: String,
}

impl FailingEngine {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(HeritageError::recognition("failing", &self.detail))
    }
}

impl PrimaryEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn recognize_page(&self, _image: &RgbImage) -> Result<Vec<RecognizedBlock>> {
        self.fail()
    }
}

impl FallbackEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn recognize_text(&self, _image: &RgbImage, _language_hint: &str) -> Result<String> {
        self.fail()
    }
}
