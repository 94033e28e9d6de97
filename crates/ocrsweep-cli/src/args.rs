// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and their mapping onto the extraction config.

use std::path::PathBuf;

use clap::Parser;
use ocrsweep_core::ExtractorConfig;
use ocrsweep_core::error::Result;

/// Extract text from scanned or rendered page images.
///
/// Every page is normalized, recognised under several page segmentation
/// modes in both plain and word-level form, and the most plausible result is
/// kept.
#[derive(Debug, Parser)]
#[command(name = "ocrsweep", version)]
pub struct Args {
    /// Page images, or directories containing them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// JSON extraction config; command-line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Recognition languages, e.g. "kor+eng"
    #[arg(long)]
    pub lang: Option<String>,

    /// Upscale factor applied before recognition (values <= 1.0 disable it)
    #[arg(long)]
    pub upscale: Option<f32>,

    /// Keep table rule lines instead of removing them
    #[arg(long)]
    pub no_lines: bool,

    /// Correct page skew (slower, occasionally worse on non-text pages)
    #[arg(long)]
    pub deskew: bool,

    /// Skip the word-level recognition pass
    #[arg(long)]
    pub no_data: bool,

    /// Minimum word confidence for the word-level pass (0-100)
    #[arg(long)]
    pub min_conf: Option<u8>,

    /// Page segmentation modes to try, in order, e.g. "6,4,1,11"
    #[arg(long, value_delimiter = ',')]
    pub psm: Vec<u8>,

    /// Run recognition attempts concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Log the five best candidate scores of every page
    #[arg(long)]
    pub debug: bool,

    /// Recognise each detected layout block separately and emit a JSON report
    #[arg(long)]
    pub blocks: bool,

    /// Write block-annotated copies of each page into this directory
    #[arg(long, value_name = "DIR")]
    pub annotate: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Image extension picked up from input directories
    #[arg(long, default_value = "png")]
    pub ext: String,

    /// Tesseract executable
    #[arg(long, default_value = "tesseract")]
    pub tesseract: PathBuf,

    /// Use the built-in ocrs engine with models from this directory
    #[cfg(feature = "ocr")]
    #[arg(long, value_name = "DIR")]
    pub ocrs_models: Option<PathBuf>,
}

impl Args {
    /// Build the effective config: file (or defaults), then flag overrides.
    pub fn extractor_config(&self) -> Result<ExtractorConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractorConfig::from_json_file(path)?,
            None => ExtractorConfig::default(),
        };

        let pre = &mut config.preprocess;
        if let Some(factor) = self.upscale {
            pre.upscale_factor = factor;
        }
        if self.no_lines {
            pre.remove_table_lines = false;
        }
        if self.deskew {
            pre.deskew = true;
        }

        let rec = &mut config.recognition;
        if let Some(lang) = &self.lang {
            rec.language = lang.clone();
        }
        if self.no_data {
            rec.use_structured_mode = false;
        }
        if let Some(min_conf) = self.min_conf {
            rec.min_word_confidence = min_conf;
        }
        if !self.psm.is_empty() {
            rec.segmentation_candidates = self.psm.clone();
        }
        if self.parallel {
            rec.parallel = true;
        }

        config.validate()?;
        Ok(config)
    }
}
