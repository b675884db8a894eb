// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration: preprocessing knobs, the per-document pipeline
// surface, and recognition engine locations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{HeritageError, Result};
use crate::types::ImageVariant;

/// Well-known filenames for the primary engine's detection and recognition models.
pub const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
pub const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Tuning for the four preprocessing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Non-local-means filter strength for luminance / single-channel images.
    pub denoise_strength: f32,
    /// Filter strength for the chroma planes of colour images.
    pub denoise_color_strength: f32,
    /// Side of the square patch compared between pixels (odd).
    pub denoise_template_window: u32,
    /// Side of the square neighbourhood searched for similar patches (odd).
    pub denoise_search_window: u32,
    /// Contrast limit for tiled histogram equalization. `0` disables clipping.
    pub clahe_clip_limit: f32,
    /// Tile grid (columns, rows) for histogram equalization.
    pub clahe_tile_grid: (u32, u32),
    /// Neighbourhood side for adaptive binarization (odd, at least 3).
    pub binarize_block_size: u32,
    /// Constant subtracted from the local weighted mean during binarization.
    pub binarize_c: f32,
    /// Below this many foreground pixels deskewing is skipped.
    pub min_foreground_pixels: usize,
    /// Skew estimates with a larger magnitude are treated as page-border
    /// artefacts and reset to zero.
    pub max_skew_degrees: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise_strength: 10.0,
            denoise_color_strength: 10.0,
            denoise_template_window: 7,
            denoise_search_window: 21,
            clahe_clip_limit: 2.0,
            clahe_tile_grid: (8, 8),
            binarize_block_size: 11,
            binarize_c: 2.0,
            min_foreground_pixels: 10,
            max_skew_degrees: 45.0,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.denoise_strength >= 0.0 && self.denoise_color_strength >= 0.0) {
            return Err(HeritageError::InvalidConfig(
                "denoise strengths must be non-negative".into(),
            ));
        }
        for (name, value) in [
            ("denoise_template_window", self.denoise_template_window),
            ("denoise_search_window", self.denoise_search_window),
        ] {
            if value == 0 || value % 2 == 0 {
                return Err(HeritageError::InvalidConfig(format!(
                    "{name} must be a positive odd number, got {value}"
                )));
            }
        }
        if self.binarize_block_size < 3 || self.binarize_block_size % 2 == 0 {
            return Err(HeritageError::InvalidConfig(format!(
                "binarize_block_size must be odd and at least 3, got {}",
                self.binarize_block_size
            )));
        }
        if self.clahe_tile_grid.0 == 0 || self.clahe_tile_grid.1 == 0 {
            return Err(HeritageError::InvalidConfig(
                "clahe_tile_grid dimensions must be non-zero".into(),
            ));
        }
        if !(self.clahe_clip_limit >= 0.0) {
            return Err(HeritageError::InvalidConfig(
                "clahe_clip_limit must be non-negative".into(),
            ));
        }
        if !(self.max_skew_degrees > 0.0 && self.max_skew_degrees <= 90.0) {
            return Err(HeritageError::InvalidConfig(format!(
                "max_skew_degrees must be in (0, 90], got {}",
                self.max_skew_degrees
            )));
        }
        Ok(())
    }
}

/// Per-document options consumed by the pipeline coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Recognise the raw image without denoise/deskew/enhance/binarize.
    pub skip_preprocessing: bool,
    /// Permit the whole-page secondary engine when the primary finds no text.
    pub allow_fallback: bool,
    /// Language codes for the secondary engine (e.g. `eng+hin`).
    pub language_hint: String,
    /// Which preprocessed variant is handed to recognition.
    pub recognition_variant: ImageVariant,
    /// Optional wall-clock budget for one document, checked between stages.
    pub deadline_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skip_preprocessing: false,
            allow_fallback: true,
            language_hint: "eng+hin".into(),
            recognition_variant: ImageVariant::Enhanced,
            deadline_ms: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.language_hint.trim().is_empty() {
            return Err(HeritageError::InvalidConfig("language_hint must not be empty".into()));
        }
        if self.deadline_ms == Some(0) {
            return Err(HeritageError::InvalidConfig("deadline_ms must be positive".into()));
        }
        Ok(())
    }
}

/// Where the recognition engines find their data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the primary text-detection model file (`.rten`).
    pub detection_model_path: PathBuf,
    /// Path to the primary text-recognition model file (`.rten`).
    pub recognition_model_path: PathBuf,
    /// Directory holding `tessdata` for the secondary engine; `None` uses the
    /// engine's built-in search path.
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    /// Points at the default model cache directory.
    fn default() -> Self {
        Self::from_model_dir(default_model_dir())
    }
}

impl EngineConfig {
    /// Expects `dir` to contain `text-detection.rten` and `text-recognition.rten`.
    pub fn from_model_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
            tessdata_dir: None,
        }
    }

    /// Verify that both primary model files exist.
    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(HeritageError::ModelLoad(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download models, \
                     or see <https://github.com/robertknight/ocrs-models>",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Whether both primary model files are present.
    pub fn models_available(&self) -> bool {
        self.detection_model_path.exists() && self.recognition_model_path.exists()
    }
}

/// Default directory for cached primary-engine model files.
///
/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Complete configuration, as stored in a JSON settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeritageConfig {
    pub preprocess: PreprocessConfig,
    pub pipeline: PipelineConfig,
    pub engines: EngineConfig,
}

impl HeritageConfig {
    /// Load and validate a JSON configuration file. Missing fields take their
    /// defaults.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Validate the preprocessing and pipeline sections. Model presence is
    /// checked when the engine is constructed.
    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        self.pipeline.validate()
    }
}
