// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-candidate recognition sweep.
//
// No single page segmentation mode works for prose, tables, and sparse forms
// alike, so every configured mode is tried in both output formats and the
// most plausible text wins. Each attempt costs a full recognition pass.

use std::collections::BTreeMap;

use image::{DynamicImage, GrayImage};
use ocrsweep_core::config::{PreprocessConfig, RecognitionConfig, ScoringWeights};
use ocrsweep_core::error::Result;
use ocrsweep_core::{Candidate, CandidateMode};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::engine::{RecognitionParams, TextRecognizer};
use super::enhance::ImageNormalizer;
use super::lines;
use super::quality::QualityScorer;

/// Result of one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    /// The winning text, whitespace-collapsed unless line breaks are kept.
    pub text: String,
    /// Score of every attempt, keyed `psm{id}_{string|data}`.
    pub diagnostics: BTreeMap<String, f64>,
    /// The winning attempt as scored, before any whitespace collapsing.
    pub winner: Option<Candidate>,
}

impl SweepOutcome {
    /// Diagnostics sorted by descending score.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .diagnostics
            .iter()
            .map(|(key, score)| (key.as_str(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Runs every (segmentation mode, output format) attempt against one
/// recognizer and keeps the highest-scoring text.
pub struct CandidateSweep<'a> {
    recognizer: &'a dyn TextRecognizer,
    scorer: QualityScorer,
}

impl<'a> CandidateSweep<'a> {
    pub fn new(recognizer: &'a dyn TextRecognizer) -> Self {
        Self {
            recognizer,
            scorer: QualityScorer::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.scorer = QualityScorer::new(weights);
        self
    }

    /// Normalize `image` once, then sweep the normalized page.
    ///
    /// Only invalid configuration and normalization failures are errors;
    /// engine failures are absorbed into empty candidates.
    #[instrument(skip_all, fields(engine = self.recognizer.name()))]
    pub fn extract_best(
        &self,
        image: &DynamicImage,
        preprocess: &PreprocessConfig,
        recognition: &RecognitionConfig,
    ) -> Result<SweepOutcome> {
        recognition.validate()?;
        let normalized = ImageNormalizer::new(preprocess.clone()).normalize(image)?;
        self.extract_best_normalized(&normalized, recognition)
    }

    /// Sweep an image that is already normalized.
    #[instrument(skip_all, fields(
        engine = self.recognizer.name(),
        width = image.width(),
        height = image.height(),
    ))]
    pub fn extract_best_normalized(
        &self,
        image: &GrayImage,
        recognition: &RecognitionConfig,
    ) -> Result<SweepOutcome> {
        recognition.validate()?;
        self.scorer.weights().validate()?;

        let plan = attempt_plan(recognition);
        info!(
            attempts = plan.len(),
            parallel = recognition.parallel,
            "Starting recognition sweep"
        );

        // Both paths yield candidates in plan order, so the first-seen
        // tie-break below is the same either way.
        let candidates: Vec<Candidate> = if recognition.parallel {
            plan.par_iter()
                .map(|&(psm, mode)| self.attempt(image, recognition, psm, mode))
                .collect()
        } else {
            plan.iter()
                .map(|&(psm, mode)| self.attempt(image, recognition, psm, mode))
                .collect()
        };

        let mut diagnostics = BTreeMap::new();
        let mut winner: Option<Candidate> = None;
        let mut best_score = f64::NEG_INFINITY;
        for candidate in candidates {
            diagnostics.insert(candidate.diagnostics_key(), candidate.score);
            if candidate.score > best_score {
                best_score = candidate.score;
                winner = Some(candidate);
            }
        }

        let chosen = winner.as_ref().map(|c| c.text.as_str()).unwrap_or_default();
        let text = if recognition.preserve_line_breaks {
            chosen.to_string()
        } else {
            collapse_whitespace(chosen)
        };

        if let Some(best) = &winner {
            info!(
                key = %best.diagnostics_key(),
                score = best.score,
                chars = text.chars().count(),
                "Sweep complete"
            );
        }

        Ok(SweepOutcome {
            text,
            diagnostics,
            winner,
        })
    }

    /// One recognition pass. Engine errors become an empty candidate.
    fn attempt(
        &self,
        image: &GrayImage,
        recognition: &RecognitionConfig,
        psm: u8,
        mode: CandidateMode,
    ) -> Candidate {
        let params = RecognitionParams::for_attempt(recognition, psm);
        let result = match mode {
            CandidateMode::PlainString => self.recognizer.recognize_text(image, &params),
            CandidateMode::Structured => self
                .recognizer
                .recognize_words(image, &params)
                .map(|words| lines::reconstruct(&words, recognition.min_word_confidence)),
        };

        let text = result.unwrap_or_else(|err| {
            warn!(psm, %mode, error = %err, "Recognition attempt failed");
            String::new()
        });
        let score = self.scorer.score(&text);
        debug!(psm, %mode, score, "Candidate scored");

        Candidate {
            text,
            score,
            mode,
            segmentation_id: psm,
        }
    }
}

/// Attempts in encounter order: configured mode order, plain text before
/// structured output for each mode. A repeated mode is tried once, at its
/// first position.
fn attempt_plan(recognition: &RecognitionConfig) -> Vec<(u8, CandidateMode)> {
    let mut modes: Vec<u8> = Vec::with_capacity(recognition.segmentation_candidates.len());
    for &psm in &recognition.segmentation_candidates {
        if modes.contains(&psm) {
            warn!(psm, "Segmentation mode listed more than once; trying it once");
        } else {
            modes.push(psm);
        }
    }

    let mut plan = Vec::with_capacity(modes.len() * 2);
    for psm in modes {
        plan.push((psm, CandidateMode::PlainString));
        if recognition.use_structured_mode {
            plan.push((psm, CandidateMode::Structured));
        }
    }
    plan
}

/// Collapse every whitespace run, newlines included, to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::engine::scripted::ScriptedRecognizer;
    use crate::scan::quality::score_text;
    use image::Luma;
    use ocrsweep_core::{GroupKey, OcrSweepError, WordToken};

    const PROSE: &str = "Hello World. This is a test document with readable prose.";
    const NOISE: &str = "H3ll0 ##@@ ???";

    fn page() -> GrayImage {
        GrayImage::from_pixel(32, 32, Luma([255u8]))
    }

    fn plain_only(modes: &[u8]) -> RecognitionConfig {
        RecognitionConfig {
            segmentation_candidates: modes.to_vec(),
            use_structured_mode: false,
            ..Default::default()
        }
    }

    #[test]
    fn picks_most_plausible_plain_text() {
        let engine = ScriptedRecognizer::new()
            .with_text(6, PROSE)
            .with_text(4, NOISE);
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &plain_only(&[6, 4]))
            .unwrap();

        assert_eq!(outcome.text, PROSE);
        assert_eq!(outcome.diagnostics.len(), 2);
        assert!(outcome.diagnostics.contains_key("psm6_string"));
        assert!(outcome.diagnostics.contains_key("psm4_string"));
        assert!(outcome.diagnostics["psm6_string"] > outcome.diagnostics["psm4_string"]);
        let winner = outcome.winner.unwrap();
        assert_eq!(winner.segmentation_id, 6);
        assert_eq!(winner.mode, CandidateMode::PlainString);
    }

    #[test]
    fn every_attempt_failing_yields_empty_text() {
        let engine = ScriptedRecognizer::new();
        let config = RecognitionConfig {
            segmentation_candidates: vec![6, 4, 1],
            ..Default::default()
        };
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &config)
            .unwrap();

        assert_eq!(outcome.text, "");
        assert_eq!(outcome.diagnostics.len(), 6);
        assert!(outcome.diagnostics.values().all(|score| *score == 0.0));
        assert_eq!(engine.calls().len(), 6);
    }

    #[test]
    fn one_failure_does_not_abort_the_sweep() {
        let engine = ScriptedRecognizer::new().with_text(4, "survivor text");
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &plain_only(&[6, 4]))
            .unwrap();
        assert_eq!(outcome.text, "survivor text");
        assert_eq!(outcome.diagnostics["psm6_string"], 0.0);
    }

    #[test]
    fn repeated_mode_is_tried_once() {
        let engine = ScriptedRecognizer::new()
            .with_text(6, PROSE)
            .with_text(4, NOISE);
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &plain_only(&[6, 4, 6]))
            .unwrap();

        assert_eq!(outcome.text, PROSE);
        assert_eq!(outcome.diagnostics.len(), 2);
        assert_eq!(engine.calls(), vec![(6, "text"), (4, "text")]);
    }

    #[test]
    fn ties_go_to_the_first_attempt() {
        let engine = ScriptedRecognizer::new()
            .with_text(11, "same words")
            .with_text(3, "same words");
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &plain_only(&[11, 3]))
            .unwrap();
        assert_eq!(outcome.winner.unwrap().segmentation_id, 11);
    }

    #[test]
    fn structured_output_competes_with_plain_text() {
        let words = vec![
            WordToken::new("Alice", Some(95), 10, GroupKey::new(0, 0, 0)),
            WordToken::new("30", Some(95), 120, GroupKey::new(0, 0, 0)),
            WordToken::new("Bob", Some(95), 10, GroupKey::new(0, 0, 1)),
        ];
        let engine = ScriptedRecognizer::new()
            .with_text(6, "A|ice ]0 |||")
            .with_words(6, words);
        let config = RecognitionConfig {
            segmentation_candidates: vec![6],
            ..Default::default()
        };
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &config)
            .unwrap();

        assert_eq!(outcome.text, "Alice 30\nBob");
        assert_eq!(outcome.winner.unwrap().mode, CandidateMode::Structured);
        assert_eq!(
            outcome.diagnostics["psm6_data"],
            score_text("Alice 30\nBob")
        );
        assert_eq!(engine.calls(), vec![(6, "text"), (6, "words")]);
    }

    #[test]
    fn low_confidence_words_are_filtered_in_structured_mode() {
        let words = vec![
            WordToken::new("kept", Some(80), 0, GroupKey::new(0, 0, 0)),
            WordToken::new("dropped", Some(10), 50, GroupKey::new(0, 0, 0)),
        ];
        let engine = ScriptedRecognizer::new().with_words(6, words);
        let config = RecognitionConfig {
            segmentation_candidates: vec![6],
            min_word_confidence: 35,
            ..Default::default()
        };
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &config)
            .unwrap();
        assert_eq!(outcome.text, "kept");
    }

    #[test]
    fn collapsing_line_breaks_applies_to_the_winner() {
        let engine = ScriptedRecognizer::new().with_text(6, "first line\n\n  second\tline\n");
        let config = RecognitionConfig {
            preserve_line_breaks: false,
            ..plain_only(&[6])
        };
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &config)
            .unwrap();
        assert_eq!(outcome.text, "first line second line");
        assert_eq!(outcome.winner.unwrap().text, "first line\n\n  second\tline\n");
    }

    #[test]
    fn parallel_sweep_matches_sequential() {
        let engine = ScriptedRecognizer::new()
            .with_text(6, PROSE)
            .with_text(4, NOISE)
            .with_text(1, PROSE)
            .with_words(11, vec![WordToken::new("$$ 1", None, 0, GroupKey::default())]);
        let sequential = RecognitionConfig {
            segmentation_candidates: vec![4, 6, 1, 11],
            ..Default::default()
        };
        let parallel = RecognitionConfig {
            parallel: true,
            ..sequential.clone()
        };

        let sweep = CandidateSweep::new(&engine);
        let a = sweep.extract_best_normalized(&page(), &sequential).unwrap();
        let b = sweep.extract_best_normalized(&page(), &parallel).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.winner.unwrap().segmentation_id, 6);
    }

    #[test]
    fn invalid_recognition_config_is_rejected() {
        let engine = ScriptedRecognizer::new();
        let config = plain_only(&[]);
        assert!(matches!(
            CandidateSweep::new(&engine).extract_best_normalized(&page(), &config),
            Err(OcrSweepError::InvalidConfig(_))
        ));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn extract_best_normalizes_before_recognition() {
        let engine = ScriptedRecognizer::new().with_text(6, PROSE);
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([240u8])));
        let preprocess = PreprocessConfig {
            upscale_factor: 1.0,
            denoise: false,
            ..Default::default()
        };
        let outcome = CandidateSweep::new(&engine)
            .extract_best(&image, &preprocess, &plain_only(&[6]))
            .unwrap();
        assert_eq!(outcome.text, PROSE);
    }

    #[test]
    fn empty_image_fails_extract_best() {
        let engine = ScriptedRecognizer::new();
        let image = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(
            CandidateSweep::new(&engine)
                .extract_best(&image, &PreprocessConfig::default(), &plain_only(&[6]))
                .is_err()
        );
    }

    #[test]
    fn custom_weights_are_used_for_ranking() {
        let engine = ScriptedRecognizer::new()
            .with_text(6, "abcdefgh")
            .with_text(4, "12345678");
        let digits_first = ScoringWeights {
            letter: 0.1,
            digit: 5.0,
            ..Default::default()
        };
        let outcome = CandidateSweep::new(&engine)
            .with_weights(digits_first)
            .extract_best_normalized(&page(), &plain_only(&[6, 4]))
            .unwrap();
        assert_eq!(outcome.text, "12345678");
    }

    #[test]
    fn ranked_orders_by_descending_score() {
        let engine = ScriptedRecognizer::new()
            .with_text(6, NOISE)
            .with_text(4, PROSE);
        let outcome = CandidateSweep::new(&engine)
            .extract_best_normalized(&page(), &plain_only(&[6, 4]))
            .unwrap();
        let ranked = outcome.ranked();
        assert_eq!(ranked[0].0, "psm4_string");
        assert_eq!(ranked[1].0, "psm6_string");
    }

    #[test]
    fn collapse_whitespace_trims_and_joins() {
        assert_eq!(collapse_whitespace("  a \n\n b\t c  "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }
}
