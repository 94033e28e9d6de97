// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrsweep-document — Adaptive OCR extraction for scanned and rendered pages.
//
// Provides page loading and cropping, a normalization pipeline (upscale,
// denoise, binarize, rule-line removal, deskew), a recognition sweep across
// page segmentation modes scored by a text plausibility heuristic, word-level
// line reconstruction, and layout block detection for per-region OCR.

pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `ocrsweep_document::CandidateSweep` etc.
pub use crate::image::processor::PageImage;
pub use scan::engine::{RecognitionParams, TextRecognizer};
pub use scan::enhance::{ImageNormalizer, ScanEnhancer};
pub use scan::layout::LayoutBlockDetector;
pub use scan::quality::QualityScorer;
pub use scan::regions::{BlockReport, RegionExtractor, RegionKind, RegionText};
pub use scan::sweep::{CandidateSweep, SweepOutcome};
pub use scan::tesseract::{TesseractConfig, TesseractRecognizer};

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrsConfig, OcrsRecognizer};
