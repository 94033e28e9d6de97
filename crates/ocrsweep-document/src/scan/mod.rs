// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction pipeline — page normalization, candidate scoring, line
// reconstruction, recognition engines, the sweep, and layout blocks.

pub mod engine;
pub mod enhance;
pub mod layout;
pub mod lines;
pub mod morphology;
pub mod quality;
pub mod regions;
pub mod sweep;
pub mod tesseract;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use engine::{RecognitionParams, TextRecognizer};
pub use enhance::{ImageNormalizer, ScanEnhancer};
pub use layout::{LayoutBlockDetector, annotate, detect_blocks};
pub use lines::{reconstruct, reconstruct_lines};
pub use quality::{QualityScorer, score_text};
pub use regions::{BlockReport, RegionExtractor, RegionKind, RegionText};
pub use sweep::{CandidateSweep, SweepOutcome};
pub use tesseract::{TesseractConfig, TesseractRecognizer};

#[cfg(feature = "ocr")]
pub use ocr::{OcrsConfig, OcrsRecognizer};
