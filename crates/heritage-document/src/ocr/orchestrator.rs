// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition orchestrator: runs the primary engine and decides when the
// whole-page fallback engine is used instead.

use std::sync::Arc;

use heritage_core::error::{HeritageError, Result};
use heritage_core::{OcrResult, PipelineConfig, RecognitionMethod};
use image::DynamicImage;
use tracing::{info, instrument, warn};

use crate::image::color::{self, ImageInput, to_model_rgb};
use crate::ocr::engine::{FallbackEngine, PrimaryEngine};

/// Per-call recognition options.
///
/// `allow_fallback` only gates the whole-page fallback taken when the primary
/// engine finds no text. Low-confidence words from the primary engine are
/// never replaced one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub allow_fallback: bool,
    /// Language list for the fallback engine, e.g. `eng+hin`.
    pub language_hint: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for RecognitionOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            allow_fallback: config.allow_fallback,
            language_hint: config.language_hint.clone(),
        }
    }
}

/// Turns a page image into an [`OcrResult`].
///
/// The primary engine handle is loaded once by the caller and shared; the
/// orchestrator itself holds no per-document state, so one instance serves
/// any number of sequential documents.
#[derive(Clone)]
pub struct RecognitionOrchestrator {
    primary: Arc<dyn PrimaryEngine>,
    fallback: Option<Arc<dyn FallbackEngine>>,
}

impl std::fmt::Debug for RecognitionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionOrchestrator")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|e| e.name().to_owned()))
            .finish()
    }
}

impl RecognitionOrchestrator {
    pub fn new(primary: Arc<dyn PrimaryEngine>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Attach the whole-page fallback engine.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackEngine>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    /// Recognise a page with the primary engine.
    ///
    /// If the primary engine yields no text, `allow_fallback` is set and a
    /// fallback engine is attached, the page is recognised again by the
    /// fallback engine and its flat text is returned tagged
    /// [`RecognitionMethod::Fallback`]. Otherwise the (possibly empty)
    /// primary result is returned. Engine errors propagate unchanged and are
    /// not retried.
    #[instrument(skip(self, image), fields(
        width = image.width(),
        height = image.height(),
        primary = self.primary.name(),
    ))]
    pub fn recognize(&self, image: &DynamicImage, options: &RecognitionOptions) -> Result<OcrResult> {
        let rgb = to_model_rgb(image);
        let blocks = self.primary.recognize_page(&rgb)?;
        let result = OcrResult::from_blocks(blocks, RecognitionMethod::Primary);

        if result.has_text() {
            info!(
                blocks = result.blocks.len(),
                words = result.words.len(),
                "Primary recognition complete"
            );
            return Ok(result);
        }

        warn!("Primary engine found no text");
        if !options.allow_fallback {
            return Ok(result);
        }
        let Some(fallback) = &self.fallback else {
            warn!("Fallback permitted but no fallback engine is configured");
            return Ok(result);
        };

        info!(engine = fallback.name(), language = %options.language_hint, "Running whole-page fallback");
        let text = fallback.recognize_text(&rgb, &options.language_hint)?;
        Ok(OcrResult::from_fallback_text(&text))
    }

    /// Normalize any supported input and recognise it.
    pub fn recognize_input(&self, input: impl Into<ImageInput>, options: &RecognitionOptions) -> Result<OcrResult> {
        let image = color::load(input.into())?;
        self.recognize(&image, options)
    }

    /// Recognise a page with the fallback engine only, skipping the primary.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn recognize_with_fallback_engine(&self, image: &DynamicImage, language_hint: &str) -> Result<OcrResult> {
        let fallback = self.fallback.as_ref().ok_or_else(|| {
            HeritageError::EngineUnavailable("no fallback engine is configured".into())
        })?;
        let text = fallback.recognize_text(&to_model_rgb(image), language_hint)?;
        Ok(OcrResult::from_fallback_text(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::{FailingEngine, StaticFallbackEngine, StaticPrimaryEngine};
    use image::{GrayImage, Luma};

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([240])))
    }

    fn options(allow_fallback: bool) -> RecognitionOptions {
        RecognitionOptions {
            allow_fallback,
            language_hint: "eng+hin".into(),
        }
    }

    #[test]
    fn primary_text_is_joined_in_order() {
        let primary = Arc::new(StaticPrimaryEngine::with_lines(&[&["Khata", "No"], &["123"]]));
        let orchestrator = RecognitionOrchestrator::new(primary.clone());
        let result = orchestrator.recognize(&page(), &options(true)).unwrap();

        assert_eq!(result.full_text, "Khata No\n123");
        assert_eq!(result.method, Some(RecognitionMethod::Primary));
        assert_eq!(result.words.len(), 3);
        assert_eq!(primary.last_dimensions(), Some((40, 30)));
    }

    #[test]
    fn fallback_is_not_consulted_when_primary_has_text() {
        let fallback = Arc::new(StaticFallbackEngine::new("unused"));
        let orchestrator = RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::with_lines(&[&["Survey"]])))
            .with_fallback(fallback.clone());
        orchestrator.recognize(&page(), &options(true)).unwrap();
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn empty_primary_falls_back_when_allowed() {
        let fallback = Arc::new(StaticFallbackEngine::new("खसरा 45\n"));
        let orchestrator =
            RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::empty())).with_fallback(fallback.clone());
        let result = orchestrator.recognize(&page(), &options(true)).unwrap();

        assert_eq!(result.method, Some(RecognitionMethod::Fallback));
        assert_eq!(result.full_text, "खसरा 45");
        assert!(result.blocks.is_empty());
        assert!(result.words.iter().all(|w| w.confidence.is_none()));
        assert_eq!(fallback.last_language().as_deref(), Some("eng+hin"));
    }

    #[test]
    fn empty_primary_stays_empty_when_fallback_disallowed() {
        let fallback = Arc::new(StaticFallbackEngine::new("should not appear"));
        let orchestrator =
            RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::empty())).with_fallback(fallback.clone());
        let result = orchestrator.recognize(&page(), &options(false)).unwrap();

        assert_eq!(result.full_text, "");
        assert_eq!(result.method, Some(RecognitionMethod::Primary));
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn missing_fallback_engine_returns_empty_primary_result() {
        let orchestrator = RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::empty()));
        let result = orchestrator.recognize(&page(), &options(true)).unwrap();
        assert!(!result.has_text());
        assert_eq!(result.method, Some(RecognitionMethod::Primary));
    }

    #[test]
    fn primary_failure_propagates_without_fallback() {
        let fallback = Arc::new(StaticFallbackEngine::new("text"));
        let orchestrator = RecognitionOrchestrator::new(Arc::new(FailingEngine::new("out of memory")))
            .with_fallback(fallback.clone());
        let err = orchestrator.recognize(&page(), &options(true)).unwrap_err();
        assert!(matches!(err, HeritageError::RecognitionFailure { ref detail, .. } if detail == "out of memory"));
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn fallback_failure_propagates() {
        let orchestrator = RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::empty()))
            .with_fallback(Arc::new(FailingEngine::new("tessdata missing")));
        assert!(orchestrator.recognize(&page(), &options(true)).is_err());
    }

    #[test]
    fn explicit_fallback_engine_choice() {
        let primary = Arc::new(StaticPrimaryEngine::with_lines(&[&["ignored"]]));
        let orchestrator = RecognitionOrchestrator::new(primary.clone())
            .with_fallback(Arc::new(StaticFallbackEngine::new("Owner: Rao  \n")));
        let result = orchestrator.recognize_with_fallback_engine(&page(), "hin").unwrap();
        assert_eq!(result.full_text, "Owner: Rao");
        assert_eq!(result.method, Some(RecognitionMethod::Fallback));
        assert_eq!(primary.calls(), 0);
    }

    #[test]
    fn explicit_fallback_without_engine_is_unavailable() {
        let orchestrator = RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::empty()));
        assert!(matches!(
            orchestrator.recognize_with_fallback_engine(&page(), "eng"),
            Err(HeritageError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn raw_bgr_input_is_canonicalized_before_recognition() {
        let primary = Arc::new(StaticPrimaryEngine::with_lines(&[&["ok"]]));
        let orchestrator = RecognitionOrchestrator::new(primary.clone());
        let raw = crate::RawPixels::new(3, 2, 4, crate::ChannelOrder::Bgr, vec![0; 24]);
        orchestrator.recognize_input(raw, &RecognitionOptions::default()).unwrap();
        assert_eq!(primary.last_dimensions(), Some((3, 2)));
    }
}
