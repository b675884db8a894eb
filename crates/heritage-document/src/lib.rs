// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// heritage-document: Image normalization and text extraction for photographed
// land records and manuscripts.
//
// Provides input loading with colour canonicalization, a four-stage scan
// preprocessor (denoise, deskew, contrast enhancement, binarization), a
// recognition orchestrator over a primary and a fallback engine, and the
// pipeline coordinator that ties them together for one document.

pub mod image;
pub mod ocr;
pub mod pipeline;
pub mod scan;

// Re-export the primary structs so callers can use `heritage_document::Preprocessor` etc.
pub use crate::image::color::{ChannelOrder, ImageInput, RawPixels};
pub use crate::ocr::orchestrator::{RecognitionOptions, RecognitionOrchestrator};
pub use crate::pipeline::{CancelHandle, PipelineCoordinator, ResultBundle};
pub use crate::scan::preprocess::{Preprocessor, ProcessedImageSet};

#[cfg(feature = "ocr")]
pub use crate::ocr::ocrs_engine::OcrsEngine;

#[cfg(feature = "tesseract")]
pub use crate::ocr::tesseract::TesseractEngine;
