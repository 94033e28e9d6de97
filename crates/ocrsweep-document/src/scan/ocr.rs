// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust recognition backend using the `ocrs` engine, with neural network
// models executed via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// ocrsweep-document = { path = "crates/ocrsweep-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`) locates words in the image.
// - **Recognition model** (`text-recognition.rten`) decodes characters from
//   each detected line.
//
// Running `ocrs-cli` once downloads both into `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is where `OcrsConfig::default` looks.
//
// `ocrs` has no notion of page segmentation modes or engine variants, and
// reports no per-word confidence. Segmentation and engine modes are ignored,
// and every word comes back with an unknown confidence.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, OcrInput, TextItem};
use ocrsweep_core::error::{OcrSweepError, Result};
use ocrsweep_core::{GroupKey, WordToken};
use rten::Model;
use rten_imageproc::Rect;
use tracing::{debug, info, instrument};

use super::engine::{RecognitionParams, TextRecognizer};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Model locations for an [`OcrsRecognizer`].
#[derive(Debug, Clone)]
pub struct OcrsConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsConfig {
    /// Expects `dir` to contain `text-detection.rten` and `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(OcrSweepError::EngineUnavailable(format!(
                    "{} model not found at {}; run `ocrs-cli` once to download models",
                    kind,
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Whether both model files are present.
    pub fn models_available(&self) -> bool {
        self.validate().is_ok()
    }
}

/// [`TextRecognizer`] backed by `ocrs`.
///
/// Model loading is the expensive step; build one recognizer and reuse it.
/// Debug builds of `ocrs` and `rten` are 10-100x slower than release builds.
pub struct OcrsRecognizer {
    engine: OcrsEngine,
}

impl OcrsRecognizer {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrsConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = load_model(&config.detection_model_path)?;
        info!("Loading OCR recognition model");
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| OcrSweepError::OcrError(format!("failed to initialise ocrs: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrsConfig::default())
    }

    fn prepare(&self, image: &GrayImage) -> Result<OcrInput> {
        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            OcrSweepError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        self.engine
            .prepare_input(source)
            .map_err(|err| OcrSweepError::OcrError(format!("OCR preprocessing failed: {}", err)))
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        OcrSweepError::EngineUnavailable(format!(
            "failed to load model from {}: {}",
            path.display(),
            err
        ))
    })
}

impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn recognize_text(&self, image: &GrayImage, params: &RecognitionParams) -> Result<String> {
        debug!(
            psm = params.segmentation_mode,
            oem = params.engine_mode,
            "ocrs ignores segmentation and engine modes"
        );
        let input = self.prepare(image)?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| OcrSweepError::OcrError(format!("text recognition failed: {}", err)))?;
        debug!(lines = text.lines().count(), "ocrs text pass complete");
        Ok(text)
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn recognize_words(
        &self,
        image: &GrayImage,
        params: &RecognitionParams,
    ) -> Result<Vec<WordToken>> {
        debug!(
            psm = params.segmentation_mode,
            "ocrs ignores segmentation and engine modes"
        );
        let input = self.prepare(image)?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| OcrSweepError::OcrError(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| OcrSweepError::OcrError(format!("line recognition failed: {}", err)))?;

        // One group per detected line, in the engine's reading order.
        let mut words = Vec::new();
        for (line_idx, line) in lines.iter().enumerate() {
            let Some(line) = line else { continue };
            let group = GroupKey::new(0, 0, line_idx as u32);
            for word in line.words() {
                let rect: Rect = word.bounding_rect();
                words.push(WordToken {
                    text: word.to_string(),
                    confidence: None,
                    left: rect.left().max(0) as u32,
                    top: rect.top().max(0) as u32,
                    width: rect.width().max(0) as u32,
                    height: rect.height().max(0) as u32,
                    group,
                });
            }
        }

        debug!(words = words.len(), lines = lines.len(), "ocrs word pass complete");
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_well_known_filenames() {
        let config = OcrsConfig::default();
        assert!(config
            .detection_model_path
            .to_string_lossy()
            .ends_with(DETECTION_MODEL_FILENAME));
        assert!(config
            .recognition_model_path
            .to_string_lossy()
            .ends_with(RECOGNITION_MODEL_FILENAME));
    }

    #[test]
    fn config_from_dir() {
        let config = OcrsConfig::from_dir("/tmp/my-models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
    }

    #[test]
    fn missing_models_are_engine_unavailable() {
        let config = OcrsConfig::from_dir("/nonexistent/path/ocr-models");
        assert!(!config.models_available());
        assert!(matches!(
            OcrsRecognizer::new(config),
            Err(OcrSweepError::EngineUnavailable(_))
        ));
    }
}
