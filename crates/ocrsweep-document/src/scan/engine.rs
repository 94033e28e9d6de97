// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition engine boundary. The sweep and region extraction drive any
// engine through `TextRecognizer`; concrete backends live in `tesseract`
// and (behind the `ocr` feature) `ocr`.

use image::GrayImage;
use ocrsweep_core::config::RecognitionConfig;
use ocrsweep_core::error::Result;
use ocrsweep_core::WordToken;

/// Parameters for a single recognition call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionParams {
    /// Engine language list, e.g. `kor+eng`.
    pub language: String,
    /// Engine algorithm variant.
    pub engine_mode: u8,
    /// Page segmentation mode id.
    pub segmentation_mode: u8,
}

impl RecognitionParams {
    pub fn new(language: impl Into<String>, engine_mode: u8, segmentation_mode: u8) -> Self {
        Self {
            language: language.into(),
            engine_mode,
            segmentation_mode,
        }
    }

    /// Parameters for one sweep attempt under `config`.
    pub fn for_attempt(config: &RecognitionConfig, segmentation_mode: u8) -> Self {
        Self::new(config.language.clone(), config.engine_mode, segmentation_mode)
    }
}

/// A text recognition engine.
///
/// Implementations must be callable from several threads at once: the sweep
/// runs attempts on the rayon pool when asked to.
pub trait TextRecognizer: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Recognise `image` as flat text.
    fn recognize_text(&self, image: &GrayImage, params: &RecognitionParams) -> Result<String>;

    /// Recognise `image` as individual words with layout keys and confidences.
    fn recognize_words(
        &self,
        image: &GrayImage,
        params: &RecognitionParams,
    ) -> Result<Vec<WordToken>>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_params_carry_language_and_engine_mode() {
        let config = RecognitionConfig {
            language: "eng".to_string(),
            engine_mode: 3,
            ..Default::default()
        };
        let params = RecognitionParams::for_attempt(&config, 11);
        assert_eq!(params, RecognitionParams::new("eng", 3, 11));
    }

    #[test]
    fn recognizers_are_usable_as_trait_objects() {
        let engine = scripted::ScriptedRecognizer::new().with_text(6, "hello");
        let dynamic: &dyn TextRecognizer = &engine;
        let image = GrayImage::new(4, 4);
        let params = RecognitionParams::new("eng", 1, 6);
        assert_eq!(dynamic.recognize_text(&image, &params).unwrap(), "hello");
        assert!(dynamic.recognize_words(&image, &params).is_err());
        assert_eq!(engine.calls(), vec![(6, "text"), (6, "words")]);
    }
}
