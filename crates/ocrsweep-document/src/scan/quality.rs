// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ground-truth-free plausibility score for recognised text.

use ocrsweep_core::ScoringWeights;

/// Per-class character counts of a string, counted in code points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharProfile {
    pub letters: usize,
    pub digits: usize,
    pub whitespace: usize,
    /// Everything that is not a letter, digit, or whitespace.
    pub punctuation: usize,
    pub total: usize,
}

impl CharProfile {
    /// Classify every code point of `text`.
    ///
    /// Letters are Unicode `Alphabetic`, which also takes in letter-like
    /// numerals (U+216B) and combining vowel signs of abugidas. Digits are
    /// the remaining `Numeric` code points, fractions and circled numbers
    /// included.
    pub fn of(text: &str) -> Self {
        let mut profile = Self::default();
        for ch in text.chars() {
            profile.total += 1;
            if ch.is_alphabetic() {
                profile.letters += 1;
            } else if ch.is_numeric() {
                profile.digits += 1;
            } else if ch.is_whitespace() {
                profile.whitespace += 1;
            } else {
                profile.punctuation += 1;
            }
        }
        profile
    }

    fn ratio(&self, count: usize) -> f64 {
        count as f64 / self.total as f64
    }
}

/// Ranks OCR candidates for the same page. Only the relative order of scores
/// is meaningful; higher is better.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer {
    weights: ScoringWeights,
}

impl QualityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score `text`. Empty input scores 0.0.
    ///
    /// Letters raise the score, digits raise it a little, punctuation and
    /// symbols lower it. The result is damped for texts shorter than the
    /// reference length. Punctuation-heavy text can score below zero.
    pub fn score(&self, text: &str) -> f64 {
        let profile = CharProfile::of(text);
        if profile.total == 0 {
            return 0.0;
        }

        let w = &self.weights;
        let letter_ratio = profile.ratio(profile.letters);
        let digit_ratio = profile.ratio(profile.digits);
        let punct_ratio = profile.ratio(profile.punctuation);
        let length_bonus =
            (profile.total as f64 / w.reference_length.max(1) as f64).min(1.0);

        (w.letter * letter_ratio + w.digit * digit_ratio - w.punctuation * punct_ratio)
            * (0.4 + 0.6 * length_bonus)
    }
}

/// Score with the default weights.
pub fn score_text(text: &str) -> f64 {
    QualityScorer::default().score(text)
}
