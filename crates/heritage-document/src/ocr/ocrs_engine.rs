// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Primary recognition engine backed by `ocrs`, a neural text detector and
// recogniser executed with `rten`.
//
// # Model Setup
//
// Two model files are required:
//
// - **Detection model** (`text-detection.rten`): locates words on the page.
// - **Recognition model** (`text-recognition.rten`): decodes characters
//   from each detected line.
//
// Running the `ocrs-cli` tool once downloads both into the default cache
// directory, `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`):
//
//   ```sh
//   cargo install ocrs-cli
//   ocrs some-image.png
//   ```
//
// **Performance:** `ocrs` and `rten` must be compiled with optimizations.
// Debug builds are 10-100x slower.

use std::path::Path;

use heritage_core::error::{HeritageError, Result};
use heritage_core::{EngineConfig, RecognizedBlock};
use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::ocr::engine::PrimaryEngine;
use crate::ocr::layout::{LineBox, PixelRect, WordBox, group_into_blocks};

const ENGINE_NAME: &str = "ocrs";

/// The `ocrs` detector + recogniser with its models loaded.
///
/// Loading the models is the expensive step: build one engine, wrap it in an
/// `Arc` and share it across documents.
pub struct OcrsEngine {
    engine: OcrEngine,
}

impl OcrsEngine {
    /// Load both models named in `config`.
    ///
    /// # Errors
    ///
    /// [`HeritageError::ModelLoad`] if a model file is missing or corrupt.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading text detection model");
        let detection_model = load_model(&config.detection_model_path, "detection")?;

        info!("Loading text recognition model");
        let recognition_model = load_model(&config.recognition_model_path, "recognition")?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| HeritageError::ModelLoad(format!("failed to initialise ocrs engine: {}", err)))?;

        info!("Primary recognition engine ready");
        Ok(Self { engine })
    }

    /// Load models from `dir`, which must hold `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(&EngineConfig::from_model_dir(dir))
    }
}

fn load_model(path: &Path, kind: &str) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        HeritageError::ModelLoad(format!(
            "failed to load {} model from {}: {}",
            kind,
            path.display(),
            err
        ))
    })
}

impl PrimaryEngine for OcrsEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    /// Detect words, group them into lines, recognise each line and group
    /// the lines into blocks. `ocrs` reports no per-word probability, so
    /// word confidence is left unset.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize_page(&self, image: &RgbImage) -> Result<Vec<RecognizedBlock>> {
        let (width, height) = image.dimensions();
        let source = ImageSource::from_bytes(image.as_raw(), (width, height)).map_err(|err| {
            HeritageError::recognition(
                ENGINE_NAME,
                format!("failed to create image source ({}x{}): {}", width, height, err),
            )
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| HeritageError::recognition(ENGINE_NAME, format!("input preparation failed: {}", err)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| HeritageError::recognition(ENGINE_NAME, format!("word detection failed: {}", err)))?;
        debug!(word_count = word_rects.len(), "Words detected");

        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(line_count = line_rects.len(), "Text lines found");

        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| HeritageError::recognition(ENGINE_NAME, format!("line recognition failed: {}", err)))?;

        let lines: Vec<LineBox> = line_texts
            .iter()
            .flatten()
            .map(|line| LineBox {
                words: line
                    .words()
                    .filter_map(|word| {
                        let text: String = word.chars().iter().map(|c| c.char).collect();
                        let text = text.trim();
                        if text.is_empty() {
                            return None;
                        }
                        let rect = word.bounding_rect();
                        Some(WordBox {
                            text: text.to_owned(),
                            confidence: None,
                            rect: PixelRect::new(
                                rect.left() as f32,
                                rect.top() as f32,
                                rect.right() as f32,
                                rect.bottom() as f32,
                            ),
                        })
                    })
                    .collect(),
            })
            .collect();

        let blocks = group_into_blocks(lines, width, height);
        info!(blocks = blocks.len(), "Primary engine recognition complete");
        Ok(blocks)
    }
}
