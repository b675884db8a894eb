// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Heritage OCR: core types, configuration and error definitions shared by
// the preprocessing, recognition and pipeline crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod integrity;
pub mod types;

pub use config::{EngineConfig, HeritageConfig, PipelineConfig, PreprocessConfig};
pub use error::HeritageError;
pub use types::*;
