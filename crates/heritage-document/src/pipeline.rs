// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline coordinator: one document in, one result bundle out.
//
// Loading, the four preprocessing stages and recognition run in sequence on
// the calling thread. Between stages the coordinator checks the optional
// deadline and cancellation handle; a running stage (including engine
// inference) is never interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use heritage_core::error::{HeritageError, Result};
use heritage_core::integrity::fingerprint_text;
use heritage_core::{ImageVariant, OcrResult, PipelineConfig, RecognitionMethod};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::image::color::{self, ImageInput};
use crate::ocr::orchestrator::{RecognitionOptions, RecognitionOrchestrator};
use crate::scan::preprocess::{Preprocessor, ProcessedImageSet};

/// Shared flag that asks a running document to stop at the next stage
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub duration_ms: f64,
}

/// Per-stage timings for one document, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub stages: Vec<StageTiming>,
    pub total_ms: f64,
}

impl StageTimings {
    pub fn get(&self, stage: &str) -> Option<f64> {
        self.stages.iter().find(|t| t.stage == stage).map(|t| t.duration_ms)
    }
}

/// Tracks stage boundaries: enforces the deadline and cancellation, and
/// records how long each stage took.
struct StageGuard<'a> {
    started: Instant,
    deadline: Option<Instant>,
    cancel: Option<&'a CancelHandle>,
    current: Option<(String, Instant)>,
    timings: Vec<StageTiming>,
}

impl<'a> StageGuard<'a> {
    fn new(budget: Option<Duration>, cancel: Option<&'a CancelHandle>) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: budget.map(|b| started + b),
            cancel,
            current: None,
            timings: Vec::new(),
        }
    }

    /// Close the running stage and open `stage`, unless the document has
    /// been cancelled or is out of time.
    fn enter(&mut self, stage: &str) -> Result<()> {
        self.close_current();
        if self.cancel.is_some_and(CancelHandle::is_cancelled) {
            warn!(stage, "Document cancelled");
            return Err(HeritageError::Cancelled { stage: stage.to_owned() });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!(stage, "Document deadline exceeded");
            return Err(HeritageError::DeadlineExceeded { stage: stage.to_owned() });
        }
        self.current = Some((stage.to_owned(), Instant::now()));
        Ok(())
    }

    fn close_current(&mut self) {
        if let Some((stage, began)) = self.current.take() {
            self.timings.push(StageTiming {
                stage,
                duration_ms: began.elapsed().as_secs_f64() * 1000.0,
            });
        }
    }

    fn finish(mut self) -> StageTimings {
        self.close_current();
        StageTimings {
            stages: self.timings,
            total_ms: self.started.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

/// Everything produced for one document.
#[derive(Debug, Clone)]
pub struct ResultBundle {
    pub document_id: Uuid,
    pub processed_at: DateTime<Utc>,
    /// All preprocessing variants, or only the original when preprocessing
    /// was skipped.
    pub images: ProcessedImageSet,
    pub ocr: OcrResult,
    pub timings: StageTimings,
}

/// The JSON-serializable part of a [`ResultBundle`] (images excluded).
#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary<'a> {
    pub document_id: Uuid,
    pub processed_at: DateTime<Utc>,
    pub dimensions: (u32, u32),
    pub variants: Vec<ImageVariant>,
    pub skew_angle: f32,
    pub method: Option<RecognitionMethod>,
    pub text_sha256: String,
    pub ocr: &'a OcrResult,
    pub timings: &'a StageTimings,
}

impl ResultBundle {
    /// Plain text handed to downstream consumers.
    pub fn text(&self) -> &str {
        &self.ocr.full_text
    }

    /// SHA-256 hex digest of the extracted text. Identical documents should
    /// produce identical fingerprints.
    pub fn text_fingerprint(&self) -> String {
        fingerprint_text(&self.ocr.full_text)
    }

    pub fn skew_angle(&self) -> f32 {
        self.images.skew_angle()
    }

    pub fn summary(&self) -> BundleSummary<'_> {
        BundleSummary {
            document_id: self.document_id,
            processed_at: self.processed_at,
            dimensions: self.images.dimensions(),
            variants: self.images.variants(),
            skew_angle: self.images.skew_angle(),
            method: self.ocr.method,
            text_sha256: self.text_fingerprint(),
            ocr: &self.ocr,
            timings: &self.timings,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary())?)
    }
}

/// The single entry point for processing a document.
#[derive(Debug, Clone)]
pub struct PipelineCoordinator {
    preprocessor: Preprocessor,
    orchestrator: RecognitionOrchestrator,
}

impl PipelineCoordinator {
    pub fn new(preprocessor: Preprocessor, orchestrator: RecognitionOrchestrator) -> Self {
        Self {
            preprocessor,
            orchestrator,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn orchestrator(&self) -> &RecognitionOrchestrator {
        &self.orchestrator
    }

    /// Process one document start to finish.
    pub fn process(&self, input: impl Into<ImageInput>, config: &PipelineConfig) -> Result<ResultBundle> {
        self.process_with_cancel(input, config, None)
    }

    /// Like [`process`](Self::process), stopping with
    /// [`HeritageError::Cancelled`] at the next stage boundary once `cancel`
    /// is triggered.
    #[instrument(skip_all, fields(
        skip_preprocessing = config.skip_preprocessing,
        allow_fallback = config.allow_fallback,
        variant = %config.recognition_variant,
    ))]
    pub fn process_with_cancel(
        &self,
        input: impl Into<ImageInput>,
        config: &PipelineConfig,
        cancel: Option<&CancelHandle>,
    ) -> Result<ResultBundle> {
        config.validate()?;
        let document_id = Uuid::new_v4();
        info!(%document_id, "Processing document");

        let mut guard = StageGuard::new(config.deadline_ms.map(Duration::from_millis), cancel);

        guard.enter("load")?;
        let original = color::load(input.into())?;

        let images = if config.skip_preprocessing {
            ProcessedImageSet::passthrough(original)
        } else {
            self.preprocessor
                .run_pipeline_on(original, |stage| guard.enter(stage.as_str()))?
        };

        guard.enter("recognition")?;
        let ocr = self.orchestrator.recognize(
            images.recognition_input(config.recognition_variant),
            &RecognitionOptions::from(config),
        )?;

        let timings = guard.finish();
        info!(
            %document_id,
            method = ?ocr.method,
            chars = ocr.full_text.chars().count(),
            total_ms = timings.total_ms,
            "Document processed"
        );

        Ok(ResultBundle {
            document_id,
            processed_at: Utc::now(),
            images,
            ocr,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::{FailingEngine, StaticFallbackEngine, StaticPrimaryEngine};
    use heritage_core::PreprocessConfig;
    use image::{DynamicImage, GrayImage, Luma};

    fn page() -> DynamicImage {
        let mut gray = GrayImage::from_pixel(48, 32, Luma([235]));
        for x in 6..42 {
            for y in 12..16 {
                gray.put_pixel(x, y, Luma([20]));
            }
        }
        DynamicImage::ImageLuma8(gray)
    }

    fn coordinator(primary: StaticPrimaryEngine) -> PipelineCoordinator {
        let preprocessor = Preprocessor::new(PreprocessConfig {
            denoise_template_window: 3,
            denoise_search_window: 5,
            ..Default::default()
        })
        .unwrap();
        PipelineCoordinator::new(preprocessor, RecognitionOrchestrator::new(Arc::new(primary)))
    }

    #[test]
    fn full_run_keeps_every_variant() {
        let coordinator = coordinator(StaticPrimaryEngine::with_lines(&[&["Khata", "No"], &["123"]]));
        let bundle = coordinator.process(page(), &PipelineConfig::default()).unwrap();

        assert_eq!(bundle.text(), "Khata No\n123");
        assert_eq!(bundle.images.variants(), ImageVariant::ALL.to_vec());
        for stage in ["load", "denoise", "deskew", "enhance_contrast", "binarize", "recognition"] {
            assert!(bundle.timings.get(stage).is_some(), "missing timing for {stage}");
        }
    }

    #[test]
    fn skipping_preprocessing_yields_passthrough_set() {
        let coordinator = coordinator(StaticPrimaryEngine::with_lines(&[&["Rao"]]));
        let config = PipelineConfig {
            skip_preprocessing: true,
            ..Default::default()
        };
        let bundle = coordinator.process(page(), &config).unwrap();
        assert!(bundle.images.is_passthrough());
        assert_eq!(bundle.skew_angle(), 0.0);
        assert!(bundle.timings.get("denoise").is_none());
    }

    #[test]
    fn empty_primary_result_is_not_an_error() {
        let coordinator = coordinator(StaticPrimaryEngine::empty());
        let config = PipelineConfig {
            allow_fallback: false,
            ..Default::default()
        };
        let bundle = coordinator.process(page(), &config).unwrap();
        assert_eq!(bundle.text(), "");
        assert_eq!(bundle.ocr.method, Some(RecognitionMethod::Primary));
    }

    #[test]
    fn fallback_flows_through_coordinator() {
        let orchestrator = RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::empty()))
            .with_fallback(Arc::new(StaticFallbackEngine::new("Survey 45")));
        let coordinator = PipelineCoordinator::new(Preprocessor::default(), orchestrator);
        let config = PipelineConfig {
            skip_preprocessing: true,
            ..Default::default()
        };
        let bundle = coordinator.process(page(), &config).unwrap();
        assert_eq!(bundle.ocr.method, Some(RecognitionMethod::Fallback));
        assert_eq!(bundle.text(), "Survey 45");
    }

    #[test]
    fn engine_failure_fails_the_whole_document() {
        let coordinator = PipelineCoordinator::new(
            Preprocessor::default(),
            RecognitionOrchestrator::new(Arc::new(FailingEngine::new("alloc failed"))),
        );
        let config = PipelineConfig {
            skip_preprocessing: true,
            ..Default::default()
        };
        assert!(matches!(
            coordinator.process(page(), &config),
            Err(HeritageError::RecognitionFailure { .. })
        ));
    }

    #[test]
    fn cancelled_document_stops_before_loading() {
        let primary = Arc::new(StaticPrimaryEngine::with_lines(&[&["x"]]));
        let coordinator = PipelineCoordinator::new(
            Preprocessor::default(),
            RecognitionOrchestrator::new(primary.clone()),
        );
        let cancel = CancelHandle::new();
        cancel.cancel();
        let result = coordinator.process_with_cancel(page(), &PipelineConfig::default(), Some(&cancel));
        assert!(matches!(result, Err(HeritageError::Cancelled { ref stage }) if stage == "load"));
        assert_eq!(primary.calls(), 0);
    }

    #[test]
    fn exhausted_deadline_stops_at_a_stage_boundary() {
        let coordinator = PipelineCoordinator::new(
            Preprocessor::default(),
            RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::with_lines(&[&["x"]]))),
        );
        let big_page = DynamicImage::ImageLuma8(GrayImage::from_fn(200, 200, |x, y| {
            Luma([((x * 31 + y * 17) % 256) as u8])
        }));
        let config = PipelineConfig {
            deadline_ms: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            coordinator.process(big_page, &config),
            Err(HeritageError::DeadlineExceeded { .. })
        ));
    }

    #[test]
    fn guard_rejects_when_budget_is_spent() {
        let mut guard = StageGuard::new(Some(Duration::ZERO), None);
        assert!(matches!(guard.enter("denoise"), Err(HeritageError::DeadlineExceeded { .. })));
    }

    #[test]
    fn invalid_pipeline_config_is_rejected() {
        let coordinator = coordinator(StaticPrimaryEngine::empty());
        let config = PipelineConfig {
            language_hint: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            coordinator.process(page(), &config),
            Err(HeritageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn fingerprint_and_json_summary() {
        let coordinator = coordinator(StaticPrimaryEngine::with_lines(&[&["Khata", "No"], &["123"]]));
        let first = coordinator.process(page(), &PipelineConfig::default()).unwrap();
        let second = coordinator.process(page(), &PipelineConfig::default()).unwrap();

        assert_eq!(first.text_fingerprint(), second.text_fingerprint());
        assert_eq!(first.text_fingerprint().len(), 64);
        assert_ne!(first.document_id, second.document_id);

        let json: serde_json::Value = serde_json::from_str(&first.to_json().unwrap()).unwrap();
        assert_eq!(json["ocr"]["full_text"], "Khata No\n123");
        assert_eq!(json["method"], "primary");
        assert_eq!(json["variants"].as_array().map(Vec::len), Some(5));
    }
}
