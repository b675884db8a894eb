// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests of the public pipeline API.

use std::sync::Arc;

use heritage_core::{ImageVariant, PipelineConfig, PreprocessConfig, RecognitionMethod};
use heritage_document::ocr::testing::{StaticFallbackEngine, StaticPrimaryEngine};
use heritage_document::{
    ChannelOrder, ImageInput, PipelineCoordinator, Preprocessor, RawPixels, RecognitionOrchestrator,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::rect::Rect;

fn quick_preprocessor() -> Preprocessor {
    Preprocessor::new(PreprocessConfig {
        denoise_template_window: 3,
        denoise_search_window: 5,
        ..Default::default()
    })
    .unwrap()
}

/// A light page with four dark ruled lines, turned `degrees` clockwise.
fn ruled_page(degrees: f32) -> GrayImage {
    let mut page = GrayImage::from_pixel(120, 120, Luma([240]));
    for i in 0..4 {
        draw_filled_rect_mut(&mut page, Rect::at(20, 30 + 18 * i).of_size(80, 5), Luma([25]));
    }
    rotate_about_center(&page, degrees.to_radians(), Interpolation::Nearest, Luma([240]))
}

#[test]
fn encoded_png_runs_through_the_whole_pipeline() {
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(ruled_page(8.0))
        .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let primary = Arc::new(StaticPrimaryEngine::with_lines(&[&["Khata", "No"], &["123"]]));
    let coordinator = PipelineCoordinator::new(quick_preprocessor(), RecognitionOrchestrator::new(primary.clone()));
    let bundle = coordinator
        .process(ImageInput::Encoded(png), &PipelineConfig::default())
        .unwrap();

    assert_eq!(bundle.text(), "Khata No\n123");
    assert!((bundle.skew_angle() + 8.0).abs() <= 2.0, "skew {}", bundle.skew_angle());
    assert_eq!(bundle.images.dimensions(), (120, 120));
    assert_eq!(primary.last_dimensions(), Some((120, 120)));
    assert_eq!(primary.calls(), 1);
}

#[test]
fn every_variant_encodes_for_display() {
    let coordinator = PipelineCoordinator::new(
        quick_preprocessor(),
        RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::with_lines(&[&["x"]]))),
    );
    let bundle = coordinator
        .process(DynamicImage::ImageLuma8(ruled_page(0.0)), &PipelineConfig::default())
        .unwrap();

    for variant in ImageVariant::ALL {
        let png = bundle.images.encode_png(variant).unwrap().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 120), "{variant}");
    }
}

#[test]
fn raw_bgr_buffer_with_fallback() {
    let (w, h) = (16u32, 8u32);
    let data = (0..w * h).flat_map(|_| [200u8, 210, 220]).collect();
    let raw = RawPixels::new(w, h, 3, ChannelOrder::Bgr, data);

    let fallback = Arc::new(StaticFallbackEngine::new("जमाबंदी 1998\n"));
    let orchestrator =
        RecognitionOrchestrator::new(Arc::new(StaticPrimaryEngine::empty())).with_fallback(fallback.clone());
    let coordinator = PipelineCoordinator::new(quick_preprocessor(), orchestrator);

    let config = PipelineConfig {
        language_hint: "hin".into(),
        ..Default::default()
    };
    let bundle = coordinator.process(raw, &config).unwrap();
    assert_eq!(bundle.ocr.method, Some(RecognitionMethod::Fallback));
    assert_eq!(bundle.text(), "जमाबंदी 1998");
    assert_eq!(fallback.last_language().as_deref(), Some("hin"));
}

#[test]
fn one_orchestrator_serves_sequential_documents() {
    let primary = Arc::new(StaticPrimaryEngine::with_lines(&[&["Survey", "No", "45"]]));
    let coordinator = PipelineCoordinator::new(quick_preprocessor(), RecognitionOrchestrator::new(primary.clone()));
    let config = PipelineConfig {
        skip_preprocessing: true,
        ..Default::default()
    };
    let first = coordinator.process(DynamicImage::ImageLuma8(ruled_page(3.0)), &config).unwrap();
    let second = coordinator.process(DynamicImage::ImageLuma8(ruled_page(3.0)), &config).unwrap();

    assert_eq!(primary.calls(), 2);
    assert_eq!(first.text_fingerprint(), second.text_fingerprint());
}

/// Real models: renders "SURVEY NO 45" with a system font, turns it 10°
/// clockwise and expects the text back. Needs the `.rten` models in the
/// default cache directory and a TrueType font.
#[cfg(feature = "ocr")]
#[test]
#[ignore = "requires ocrs models and a system font"]
fn survey_number_is_read_from_a_skewed_page() {
    use ab_glyph::{FontVec, PxScale};
    use heritage_core::EngineConfig;
    use heritage_document::OcrsEngine;
    use imageproc::drawing::draw_text_mut;

    const FONT_CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    let engines = EngineConfig::default();
    if !engines.models_available() {
        eprintln!("skipping: ocrs models not found");
        return;
    }
    let Some(font) = FONT_CANDIDATES
        .iter()
        .filter_map(|path| std::fs::read(path).ok())
        .find_map(|bytes| FontVec::try_from_vec(bytes).ok())
    else {
        eprintln!("skipping: no TrueType font found");
        return;
    };

    let mut page = GrayImage::from_pixel(200, 200, Luma([255]));
    draw_text_mut(&mut page, Luma([0]), 18, 90, PxScale::from(20.0), &font, "SURVEY NO 45");
    let skewed = rotate_about_center(&page, 10f32.to_radians(), Interpolation::Bilinear, Luma([255]));

    let engine = Arc::new(OcrsEngine::new(&engines).unwrap());
    let coordinator = PipelineCoordinator::new(Preprocessor::default(), RecognitionOrchestrator::new(engine));
    let bundle = coordinator
        .process(DynamicImage::ImageLuma8(skewed), &PipelineConfig::default())
        .unwrap();

    assert!((bundle.skew_angle() + 10.0).abs() <= 2.0, "skew {}", bundle.skew_angle());
    let text = bundle.text().to_uppercase();
    let line = text
        .lines()
        .find(|l| l.contains("SURVEY NO"))
        .unwrap_or_else(|| panic!("no survey line in {text:?}"));
    let tail = line.split("SURVEY NO").nth(1).unwrap_or_default().trim();
    assert_eq!(tail.chars().count(), 2, "expected a two-character number, got {tail:?}");
}
