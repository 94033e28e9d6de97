// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract backend. Drives the `tesseract` command-line tool, piping the
// page through stdin as PNG and reading plain text or TSV from stdout.
//
// The binary and its language data must be installed separately:
//
// ```sh
// apt install tesseract-ocr tesseract-ocr-kor
// tesseract --list-langs
// ```

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::GrayImage;
use ocrsweep_core::error::{OcrSweepError, Result};
use ocrsweep_core::{GroupKey, WordToken};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::engine::{RecognitionParams, TextRecognizer};
use crate::image::encode_png;

/// TSV row level for individual words.
const WORD_LEVEL: u32 = 5;

/// Number of columns in a Tesseract TSV row (the text column may be absent).
const TSV_COLUMNS: usize = 12;

/// How to invoke the Tesseract binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Executable name or path.
    pub binary: PathBuf,
    /// Appended to every invocation before the output format, e.g. `--dpi 300`.
    pub extra_args: Vec<String>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            extra_args: Vec::new(),
        }
    }
}

/// [`TextRecognizer`] backed by the Tesseract CLI.
///
/// Each call spawns one process, so concurrent calls from the rayon pool are
/// independent.
#[derive(Debug, Clone, Default)]
pub struct TesseractRecognizer {
    config: TesseractConfig,
}

impl TesseractRecognizer {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    /// Whether the configured binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Installed language packs, as reported by `--list-langs`.
    pub fn list_languages(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.config.binary)
            .arg("--list-langs")
            .output()
            .map_err(|err| self.unavailable(err))?;

        if !output.status.success() {
            return Err(OcrSweepError::OcrError(format!(
                "tesseract --list-langs failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // First line is a header ("List of available languages ...").
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Run one recognition pass and return stdout.
    fn run(&self, image: &GrayImage, params: &RecognitionParams, format: Option<&str>) -> Result<String> {
        let png = encode_png(image)?;

        let mut command = Command::new(&self.config.binary);
        command
            .args(["stdin", "stdout", "-l"])
            .arg(&params.language)
            .arg("--oem")
            .arg(params.engine_mode.to_string())
            .arg("--psm")
            .arg(params.segmentation_mode.to_string())
            .args(&self.config.extra_args);
        if let Some(format) = format {
            command.arg(format);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.unavailable(err))?;

        if let Some(mut stdin) = child.stdin.take() {
            // Tesseract reads the whole image before writing anything, so a
            // blocking write cannot deadlock against a full stdout pipe.
            if let Err(err) = stdin.write_all(&png) {
                warn!(error = %err, "Failed to pipe image into tesseract");
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(OcrSweepError::OcrError(format!(
                "tesseract exited with {} (psm {}): {}",
                output.status,
                params.segmentation_mode,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn unavailable(&self, err: std::io::Error) -> OcrSweepError {
        OcrSweepError::EngineUnavailable(format!(
            "cannot run {}: {} (is tesseract installed?)",
            self.config.binary.display(),
            err
        ))
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip(self, image), fields(psm = params.segmentation_mode))]
    fn recognize_text(&self, image: &GrayImage, params: &RecognitionParams) -> Result<String> {
        let text = self.run(image, params, None)?;
        debug!(chars = text.chars().count(), "Tesseract text pass complete");
        Ok(text)
    }

    #[instrument(skip(self, image), fields(psm = params.segmentation_mode))]
    fn recognize_words(
        &self,
        image: &GrayImage,
        params: &RecognitionParams,
    ) -> Result<Vec<WordToken>> {
        let tsv = self.run(image, params, Some("tsv"))?;
        let words = parse_tsv(&tsv);
        debug!(words = words.len(), "Tesseract word pass complete");
        Ok(words)
    }
}

/// Parse Tesseract TSV output into word tokens.
///
/// Only word-level rows are kept. Rows that do not parse (the header,
/// truncated lines) are skipped. A confidence of `-1` or any other negative
/// value becomes `None`; fractional confidences are truncated.
pub fn parse_tsv(tsv: &str) -> Vec<WordToken> {
    tsv.lines().filter_map(parse_tsv_row).collect()
}

fn parse_tsv_row(row: &str) -> Option<WordToken> {
    let cols: Vec<&str> = row.split('\t').collect();
    if cols.len() < TSV_COLUMNS - 1 {
        return None;
    }

    let number = |idx: usize| cols[idx].trim().parse::<u32>().ok();
    if number(0)? != WORD_LEVEL {
        return None;
    }

    let confidence = cols[10]
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|conf| *conf >= 0.0)
        .map(|conf| conf.min(100.0) as u8);

    Some(WordToken {
        text: cols.get(11).copied().unwrap_or_default().to_string(),
        confidence,
        left: number(6)?,
        top: number(7)?,
        width: number(8)?,
        height: number(9)?,
        group: GroupKey::new(number(2)?, number(3)?, number(4)?),
    })
}
