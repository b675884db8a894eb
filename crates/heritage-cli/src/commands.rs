// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heritage_core::error::{HeritageError, Result};
use heritage_core::{EngineConfig, HeritageConfig, OcrResult};
use heritage_document::image::raster;
use heritage_document::image::to_model_rgb;
use heritage_document::ocr::FallbackEngine;
use heritage_document::{
    OcrsEngine, PipelineCoordinator, Preprocessor, ProcessedImageSet, RecognitionOrchestrator,
};
use tracing::{info, warn};

use crate::{EngineChoice, PreprocessArgs, RunArgs};

/// `heritage-ocr run`: one document through the full pipeline.
pub fn run(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, args);
    config.validate()?;

    let preprocessor = Preprocessor::new(config.preprocess.clone())?;
    let fallback = fallback_engine(&config);

    match args.engine {
        EngineChoice::Primary => {
            let primary = Arc::new(OcrsEngine::new(&config.engines)?);
            let mut orchestrator = RecognitionOrchestrator::new(primary);
            if let Some(fallback) = fallback {
                orchestrator = orchestrator.with_fallback(fallback);
            }
            info!(
                primary = orchestrator.primary_name(),
                fallback = orchestrator.has_fallback(),
                "Engines ready"
            );
            let coordinator = PipelineCoordinator::new(preprocessor, orchestrator);
            let bundle = coordinator.process(args.image.clone(), &config.pipeline)?;

            if let Some(dir) = &args.save_variants {
                write_variants(&bundle.images, &args.image, dir)?;
            }
            if args.json {
                println!("{}", bundle.to_json()?);
            } else {
                println!("{}", bundle.text());
            }
        }
        EngineChoice::Fallback => {
            let fallback = fallback.ok_or_else(|| {
                HeritageError::EngineUnavailable(
                    "the fallback engine is not available in this build or could not start".into(),
                )
            })?;
            let images = if config.pipeline.skip_preprocessing {
                ProcessedImageSet::passthrough(preprocessor.load(args.image.clone())?)
            } else {
                preprocessor.run_pipeline(args.image.clone())?
            };
            let page = to_model_rgb(images.recognition_input(config.pipeline.recognition_variant));
            let text = fallback.recognize_text(&page, &config.pipeline.language_hint)?;
            let result = OcrResult::from_fallback_text(&text);

            if let Some(dir) = &args.save_variants {
                write_variants(&images, &args.image, dir)?;
            }
            if args.json {
                println!("{}", result.to_json()?);
            } else {
                println!("{}", result.full_text);
            }
        }
    }
    Ok(())
}

/// `heritage-ocr preprocess`: write every variant for inspection.
pub fn preprocess(config_path: Option<&Path>, args: &PreprocessArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let preprocessor = Preprocessor::new(config.preprocess)?;
    let images = preprocessor.run_pipeline(args.image.clone())?;
    let written = write_variants(&images, &args.image, &args.out)?;
    println!("skew angle: {:.2}°", images.skew_angle());
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<HeritageConfig> {
    match path {
        Some(path) => HeritageConfig::load(path),
        None => Ok(HeritageConfig::default()),
    }
}

fn apply_overrides(config: &mut HeritageConfig, args: &RunArgs) {
    let pipeline = &mut config.pipeline;
    pipeline.skip_preprocessing |= args.skip_preprocessing;
    if args.no_fallback {
        pipeline.allow_fallback = false;
    }
    if let Some(lang) = &args.lang {
        pipeline.language_hint = lang.clone();
    }
    if let Some(variant) = args.variant {
        pipeline.recognition_variant = variant;
    }
    if args.deadline_ms.is_some() {
        pipeline.deadline_ms = args.deadline_ms;
    }
    if let Some(dir) = &args.model_dir {
        config.engines = EngineConfig {
            tessdata_dir: config.engines.tessdata_dir.take(),
            ..EngineConfig::from_model_dir(dir)
        };
    }
}

#[cfg(feature = "tesseract")]
fn fallback_engine(config: &HeritageConfig) -> Option<Arc<dyn FallbackEngine>> {
    use heritage_document::TesseractEngine;

    match TesseractEngine::new(&config.engines, &config.pipeline.language_hint) {
        Ok(engine) => Some(Arc::new(engine) as Arc<dyn FallbackEngine>),
        Err(err) => {
            warn!(error = %err, "Fallback engine unavailable; continuing without it");
            None
        }
    }
}

#[cfg(not(feature = "tesseract"))]
fn fallback_engine(_config: &HeritageConfig) -> Option<Arc<dyn FallbackEngine>> {
    warn!("Built without the `tesseract` feature; no fallback engine");
    None
}

/// Write each variant as `<stem>-<variant>.png` into `dir`.
fn write_variants(images: &ProcessedImageSet, source: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");

    let mut written = Vec::new();
    for variant in images.variants() {
        let Some(image) = images.get(variant) else {
            continue;
        };
        let path = dir.join(format!("{stem}-{variant}.png"));
        raster::save(image, &path)?;
        written.push(path);
    }
    info!(count = written.len(), dir = %dir.display(), "Variants written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heritage_core::ImageVariant;
    use image::{DynamicImage, GrayImage, Luma};

    fn args() -> RunArgs {
        RunArgs {
            image: PathBuf::from("khata.png"),
            model_dir: Some(PathBuf::from("/opt/models")),
            skip_preprocessing: false,
            no_fallback: true,
            lang: Some("hin".into()),
            variant: Some(ImageVariant::Deskewed),
            engine: EngineChoice::Primary,
            deadline_ms: Some(5000),
            json: false,
            save_variants: None,
        }
    }

    #[test]
    fn flags_override_file_config() {
        let mut config = HeritageConfig::default();
        config.engines.tessdata_dir = Some(PathBuf::from("/usr/share/tessdata"));
        apply_overrides(&mut config, &args());

        assert!(!config.pipeline.allow_fallback);
        assert_eq!(config.pipeline.language_hint, "hin");
        assert_eq!(config.pipeline.recognition_variant, ImageVariant::Deskewed);
        assert_eq!(config.pipeline.deadline_ms, Some(5000));
        assert_eq!(
            config.engines.detection_model_path,
            PathBuf::from("/opt/models/text-detection.rten")
        );
        assert_eq!(config.engines.tessdata_dir, Some(PathBuf::from("/usr/share/tessdata")));
    }

    #[test]
    fn variants_are_written_with_source_stem() {
        let dir = tempfile::tempdir().unwrap();
        let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(12, 10, Luma([200])));
        let images = ProcessedImageSet::passthrough(page);

        let written = write_variants(&images, Path::new("scans/khata-17.jpg"), dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join("khata-17-original.png")]);
        assert!(written[0].exists());
    }
}
