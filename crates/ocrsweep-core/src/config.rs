// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction configuration: preprocessing, recognition sweep, scoring, and
// layout detection settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OcrSweepError, Result};

/// Highest Tesseract page segmentation mode id.
pub const MAX_SEGMENTATION_MODE: u8 = 13;

/// Longest side of the layout merge kernel.
pub const MAX_MERGE_KERNEL: u32 = 511;

/// Image conditioning applied before recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Uniform scale factor. Values `<= 1.0` leave the size unchanged.
    pub upscale_factor: f32,
    pub denoise: bool,
    pub binarize: bool,
    /// Gaussian local thresholding when true, global Otsu otherwise.
    pub adaptive_threshold: bool,
    /// Ignored unless `binarize` is set.
    pub remove_table_lines: bool,
    /// Ignored unless `binarize` is set.
    pub deskew: bool,
    /// Non-local means filter strength.
    pub denoise_strength: f32,
    /// Side of the patch compared by the denoiser (odd).
    pub denoise_template_window: u32,
    /// Side of the neighbourhood searched by the denoiser (odd).
    pub denoise_search_window: u32,
    /// Side of the adaptive threshold neighbourhood (odd).
    pub adaptive_block_size: u32,
    /// Subtracted from the local weighted mean.
    pub adaptive_offset: i32,
    pub inpaint_radius: u32,
    /// Skew corrections below this many degrees are skipped.
    pub min_deskew_angle: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 2.0,
            denoise: true,
            binarize: true,
            adaptive_threshold: true,
            remove_table_lines: true,
            deskew: false,
            denoise_strength: 10.0,
            denoise_template_window: 7,
            denoise_search_window: 21,
            adaptive_block_size: 35,
            adaptive_offset: 15,
            inpaint_radius: 2,
            min_deskew_angle: 0.3,
        }
    }
}

impl PreprocessConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.upscale_factor.is_finite() {
            return Err(OcrSweepError::InvalidConfig(format!(
                "upscale factor must be finite, got {}",
                self.upscale_factor
            )));
        }
        if !self.denoise_strength.is_finite() || self.denoise_strength <= 0.0 {
            return Err(OcrSweepError::InvalidConfig(format!(
                "denoise strength must be positive, got {}",
                self.denoise_strength
            )));
        }
        require_odd("denoise template window", self.denoise_template_window)?;
        require_odd("denoise search window", self.denoise_search_window)?;
        require_odd("adaptive block size", self.adaptive_block_size)?;
        if self.adaptive_block_size < 3 {
            return Err(OcrSweepError::InvalidConfig(format!(
                "adaptive block size must be at least 3, got {}",
                self.adaptive_block_size
            )));
        }
        if !self.min_deskew_angle.is_finite() || self.min_deskew_angle < 0.0 {
            return Err(OcrSweepError::InvalidConfig(format!(
                "minimum deskew angle must be non-negative, got {}",
                self.min_deskew_angle
            )));
        }
        Ok(())
    }

    /// Whether the upscale stage does anything.
    pub fn upscales(&self) -> bool {
        self.upscale_factor > 1.0
    }
}

fn require_odd(name: &str, value: u32) -> Result<()> {
    if value == 0 || value % 2 == 0 {
        return Err(OcrSweepError::InvalidConfig(format!(
            "{} must be a positive odd number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Recognition sweep settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Engine language list, e.g. `kor+eng`.
    pub language: String,
    /// Engine algorithm variant (Tesseract `--oem`).
    pub engine_mode: u8,
    /// Page segmentation modes tried, in order.
    pub segmentation_candidates: Vec<u8>,
    /// Also try word-level output rebuilt into lines.
    pub use_structured_mode: bool,
    /// Words with a known confidence below this are dropped.
    pub min_word_confidence: u8,
    /// When false, the chosen text has every whitespace run collapsed to one space.
    pub preserve_line_breaks: bool,
    /// Run attempts concurrently on the rayon pool.
    pub parallel: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "kor+eng".to_string(),
            engine_mode: 1,
            segmentation_candidates: vec![6, 4, 1, 11],
            use_structured_mode: true,
            min_word_confidence: 35,
            preserve_line_breaks: true,
            parallel: false,
        }
    }
}

impl RecognitionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(OcrSweepError::InvalidConfig(
                "language must not be empty".to_string(),
            ));
        }
        if self.segmentation_candidates.is_empty() {
            return Err(OcrSweepError::InvalidConfig(
                "at least one segmentation mode is required".to_string(),
            ));
        }
        // Repeats are allowed; the sweep tries each mode once.
        for &psm in &self.segmentation_candidates {
            if psm > MAX_SEGMENTATION_MODE {
                return Err(OcrSweepError::InvalidConfig(format!(
                    "segmentation mode {} is out of range 0..={}",
                    psm, MAX_SEGMENTATION_MODE
                )));
            }
        }
        if self.min_word_confidence > 100 {
            return Err(OcrSweepError::InvalidConfig(format!(
                "minimum word confidence must be 0..=100, got {}",
                self.min_word_confidence
            )));
        }
        Ok(())
    }
}

/// Weights of the text plausibility score.
///
/// `score = (letter * letter_ratio + digit * digit_ratio - punctuation *
/// punct_ratio) * (0.4 + 0.6 * min(len / reference_length, 1))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub letter: f64,
    pub digit: f64,
    pub punctuation: f64,
    /// Length in characters at which the length bonus saturates.
    pub reference_length: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            letter: 2.2,
            digit: 0.6,
            punctuation: 1.4,
            reference_length: 500,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.letter, self.digit, self.punctuation];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(OcrSweepError::InvalidConfig(format!(
                "scoring weights must be finite and non-negative: {:?}",
                self
            )));
        }
        if self.reference_length == 0 {
            return Err(OcrSweepError::InvalidConfig(
                "reference length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Layout block detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Boxes smaller than this many pixels are dropped as noise.
    pub min_area: u64,
    /// Dilation kernel (width, height) fusing neighbouring glyphs.
    pub merge_kernel: (u32, u32),
    pub block_size: u32,
    pub offset: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_area: 800,
            merge_kernel: (15, 7),
            block_size: 35,
            offset: 15,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        let (kw, kh) = self.merge_kernel;
        if kw == 0 || kh == 0 {
            return Err(OcrSweepError::InvalidConfig(format!(
                "merge kernel must be non-empty, got {}x{}",
                kw, kh
            )));
        }
        if kw > MAX_MERGE_KERNEL || kh > MAX_MERGE_KERNEL {
            return Err(OcrSweepError::InvalidConfig(format!(
                "merge kernel sides must be at most {}, got {}x{}",
                MAX_MERGE_KERNEL, kw, kh
            )));
        }
        require_odd("layout block size", self.block_size)?;
        if self.block_size < 3 {
            return Err(OcrSweepError::InvalidConfig(format!(
                "layout block size must be at least 3, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

/// Everything an extraction run needs, loadable from one JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub preprocess: PreprocessConfig,
    pub recognition: RecognitionConfig,
    pub scoring: ScoringWeights,
    pub layout: LayoutConfig,
}

impl ExtractorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        self.recognition.validate()?;
        self.scoring.validate()?;
        self.layout.validate()
    }
}
