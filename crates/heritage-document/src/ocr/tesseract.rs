// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whole-page fallback engine backed by Tesseract (via `leptess`).
//
// Requires the Tesseract library and the language data for every language in
// the hint (e.g. `eng.traineddata` and `hin.traineddata` for `eng+hin`).

use std::path::PathBuf;

use heritage_core::EngineConfig;
use heritage_core::error::{HeritageError, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use leptess::LepTess;
use tracing::{debug, info, instrument};

use crate::ocr::engine::FallbackEngine;

const ENGINE_NAME: &str = "tesseract";

/// Resolution reported to Tesseract for pages without DPI metadata.
const SOURCE_DPI: i32 = 300;

/// Tesseract as a flat-text recogniser.
///
/// A Tesseract instance is bound to one language set, so a fresh instance is
/// created for every page.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    tessdata_dir: Option<PathBuf>,
}

impl TesseractEngine {
    /// Verify that Tesseract starts with `probe_language` and keep the
    /// tessdata location from `config`.
    ///
    /// # Errors
    ///
    /// [`HeritageError::EngineUnavailable`] if Tesseract or the language data
    /// cannot be loaded.
    #[instrument(skip(config))]
    pub fn new(config: &EngineConfig, probe_language: &str) -> Result<Self> {
        let engine = Self {
            tessdata_dir: config.tessdata_dir.clone(),
        };
        engine.open(probe_language).map_err(|err| {
            HeritageError::EngineUnavailable(format!(
                "Tesseract could not start with language '{}': {}",
                probe_language, err
            ))
        })?;
        info!(language = probe_language, "Fallback recognition engine ready");
        Ok(engine)
    }

    fn open(&self, language: &str) -> std::result::Result<LepTess, String> {
        let data_path = self.tessdata_dir.as_deref().and_then(|p| p.to_str());
        LepTess::new(data_path, language).map_err(|err| err.to_string())
    }
}

impl FallbackEngine for TesseractEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn recognize_text(&self, image: &RgbImage, language_hint: &str) -> Result<String> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(HeritageError::recognition(
                ENGINE_NAME,
                format!("empty image ({}x{})", width, height),
            ));
        }

        let mut tess = self.open(language_hint).map_err(|err| {
            HeritageError::recognition(ENGINE_NAME, format!("initialisation failed: {}", err))
        })?;

        // leptess takes encoded image data.
        let mut png = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|err| HeritageError::recognition(ENGINE_NAME, format!("failed to encode page: {}", err)))?;

        tess.set_image_from_mem(png.get_ref())
            .map_err(|err| HeritageError::recognition(ENGINE_NAME, format!("failed to set image: {}", err)))?;
        tess.set_source_resolution(SOURCE_DPI);

        let text = tess
            .get_utf8_text()
            .map_err(|err| HeritageError::recognition(ENGINE_NAME, format!("text extraction failed: {}", err)))?;
        debug!(chars = text.chars().count(), "Fallback recognition complete");
        Ok(text)
    }
}
