// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The four-stage preprocessor and the image set it produces.

use std::collections::BTreeMap;

use heritage_core::error::Result;
use heritage_core::{ImageVariant, PreprocessConfig};
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use tracing::{info, instrument};

use crate::image::color::{self, ImageInput};
use crate::image::raster::{self, encode_png};
use crate::scan::{binarize, contrast, denoise, deskew};

/// Preprocessing stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessStage {
    Denoise,
    Deskew,
    EnhanceContrast,
    Binarize,
}

impl PreprocessStage {
    pub const ALL: [PreprocessStage; 4] =
        [Self::Denoise, Self::Deskew, Self::EnhanceContrast, Self::Binarize];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Denoise => "denoise",
            Self::Deskew => "deskew",
            Self::EnhanceContrast => "enhance_contrast",
            Self::Binarize => "binarize",
        }
    }
}

impl std::fmt::Display for PreprocessStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every image variant produced from one input, plus the applied skew angle.
///
/// All variants share the original's width and height. `denoised` and
/// `deskewed` keep the original's pixel layout; `enhanced` and `binary` are
/// single-channel.
#[derive(Debug, Clone)]
pub struct ProcessedImageSet {
    original: DynamicImage,
    derived: BTreeMap<ImageVariant, DynamicImage>,
    skew_angle: f32,
}

impl ProcessedImageSet {
    /// A set holding only the original image, used when preprocessing is
    /// skipped.
    pub fn passthrough(original: DynamicImage) -> Self {
        Self {
            original,
            derived: BTreeMap::new(),
            skew_angle: 0.0,
        }
    }

    pub fn original(&self) -> &DynamicImage {
        &self.original
    }

    /// Look up a variant by name.
    pub fn get(&self, variant: ImageVariant) -> Option<&DynamicImage> {
        match variant {
            ImageVariant::Original => Some(&self.original),
            other => self.derived.get(&other),
        }
    }

    /// Rotation applied during deskewing, in degrees (clockwise positive).
    pub fn skew_angle(&self) -> f32 {
        self.skew_angle
    }

    pub fn is_passthrough(&self) -> bool {
        self.derived.is_empty()
    }

    /// Variants present in this set, in pipeline order.
    pub fn variants(&self) -> Vec<ImageVariant> {
        ImageVariant::ALL
            .into_iter()
            .filter(|v| self.get(*v).is_some())
            .collect()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.original.width(), self.original.height())
    }

    /// The image handed to recognition: `preferred` if this set holds it,
    /// otherwise the original.
    pub fn recognition_input(&self, preferred: ImageVariant) -> &DynamicImage {
        self.get(preferred).unwrap_or(&self.original)
    }

    /// PNG bytes of one variant, for display or inspection. `None` if the
    /// set does not hold that variant.
    pub fn encode_png(&self, variant: ImageVariant) -> Option<Result<Vec<u8>>> {
        self.get(variant).map(encode_png)
    }
}

/// Turns an arbitrary input image into a [`ProcessedImageSet`].
///
/// Degenerate pages (blank, uniform, almost no ink) never fail: each stage
/// falls back to leaving the image as it is.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Normalize any supported input. See [`color::load`].
    pub fn load(&self, input: impl Into<ImageInput>) -> Result<DynamicImage> {
        color::load(input.into())
    }

    pub fn to_grayscale(&self, image: &DynamicImage) -> GrayImage {
        raster::to_grayscale(image)
    }

    pub fn denoise(&self, image: &DynamicImage) -> DynamicImage {
        denoise::denoise(image, &denoise::DenoiseParams::from(&self.config))
    }

    /// Denoise with an explicit filter strength applied to every plane.
    pub fn denoise_with_strength(&self, image: &DynamicImage, strength: f32) -> DynamicImage {
        let params = denoise::DenoiseParams {
            strength,
            color_strength: strength,
            ..denoise::DenoiseParams::from(&self.config)
        };
        denoise::denoise(image, &params)
    }

    pub fn enhance_contrast(&self, image: &DynamicImage) -> GrayImage {
        contrast::enhance_contrast(image, self.config.clahe_clip_limit, self.config.clahe_tile_grid)
    }

    /// Returns the levelled image and the applied angle in degrees.
    pub fn deskew(&self, image: &DynamicImage) -> (DynamicImage, f32) {
        deskew::deskew(
            image,
            self.config.min_foreground_pixels,
            self.config.max_skew_degrees,
        )
    }

    pub fn binarize(&self, image: &DynamicImage) -> GrayImage {
        binarize::binarize(image, self.config.binarize_block_size, self.config.binarize_c)
    }

    /// Load `input` and run denoise → deskew → enhance contrast → binarize.
    pub fn run_pipeline(&self, input: impl Into<ImageInput>) -> Result<ProcessedImageSet> {
        let original = self.load(input)?;
        self.run_pipeline_on(original, |_| Ok(()))
    }

    /// Run the four stages on an already loaded image.
    ///
    /// `before_stage` is called ahead of each stage; an error from it stops
    /// the run and is returned unchanged.
    #[instrument(skip_all, fields(width = original.width(), height = original.height()))]
    pub fn run_pipeline_on<F>(&self, original: DynamicImage, mut before_stage: F) -> Result<ProcessedImageSet>
    where
        F: FnMut(PreprocessStage) -> Result<()>,
    {
        info!("Preprocessing started");

        before_stage(PreprocessStage::Denoise)?;
        let denoised = self.denoise(&original);

        before_stage(PreprocessStage::Deskew)?;
        let (deskewed, skew_angle) = self.deskew(&denoised);

        before_stage(PreprocessStage::EnhanceContrast)?;
        let enhanced = DynamicImage::ImageLuma8(self.enhance_contrast(&deskewed));

        before_stage(PreprocessStage::Binarize)?;
        let binary = DynamicImage::ImageLuma8(self.binarize(&enhanced));

        info!(skew_angle, "Preprocessing complete");
        let derived = BTreeMap::from([
            (ImageVariant::Denoised, denoised),
            (ImageVariant::Deskewed, deskewed),
            (ImageVariant::Enhanced, enhanced),
            (ImageVariant::Binary, binary),
        ]);
        Ok(ProcessedImageSet {
            original,
            derived,
            skew_angle,
        })
    }
}
