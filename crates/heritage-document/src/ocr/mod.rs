// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition: engine seams, layout grouping, the orchestrator that
// chooses between the primary and fallback engines, and the concrete
// backends.
//
// # Feature Gates
//
// - `ocr` enables [`ocrs_engine::OcrsEngine`], the neural detector and
//   recogniser (`ocrs` + `rten`). Requires the two `.rten` model files.
// - `tesseract` enables [`tesseract::TesseractEngine`], the classical
//   whole-page fallback (`leptess`). Requires Tesseract and its language data.
// - `testing` exposes [`testing`], mock engines that need no model files.

pub mod engine;
pub mod layout;
pub mod orchestrator;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(feature = "ocr")]
pub mod ocrs_engine;

#[cfg(feature = "tesseract")]
pub mod tesseract;

pub use engine::{FallbackEngine, PrimaryEngine};
pub use orchestrator::{RecognitionOptions, RecognitionOrchestrator};
