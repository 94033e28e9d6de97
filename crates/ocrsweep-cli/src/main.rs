// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrsweep — Adaptive OCR extraction for page images.
//
// Entry point. Initialises logging, resolves the extraction config, picks the
// recognition engine, and runs whole-page or per-block extraction.

mod args;
mod pipeline;

use std::process::ExitCode;

use clap::Parser;
use ocrsweep_core::error::{OcrSweepError, Result};
use ocrsweep_document::{TesseractConfig, TesseractRecognizer, TextRecognizer};
use tracing::{error, info, warn};

use args::Args;
use pipeline::BatchExtractor;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "ocrsweep failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.extractor_config()?;
    let inputs = pipeline::collect_inputs(&args.inputs, &args.ext)?;
    if inputs.is_empty() {
        return Err(OcrSweepError::InvalidConfig(
            "no input images found".to_string(),
        ));
    }

    let recognizer = build_recognizer(args, &config.recognition.language)?;
    info!(
        engine = recognizer.name(),
        pages = inputs.len(),
        "ocrsweep starting"
    );

    let extractor = BatchExtractor::new(recognizer.as_ref(), &config).with_score_log(args.debug);

    let output = if args.blocks || args.annotate.is_some() {
        let reports = extractor.block_reports(&inputs, args.annotate.as_deref());
        let json = match reports.as_slice() {
            [single] => single.to_json_pretty()?,
            _ => serde_json::to_string_pretty(&reports)?,
        };
        format!("{json}\n")
    } else {
        pipeline::format_pages(&extractor.extract_pages(&inputs))
    };

    pipeline::write_output(args.output.as_deref(), &output)
}

fn build_recognizer(args: &Args, language: &str) -> Result<Box<dyn TextRecognizer>> {
    #[cfg(feature = "ocr")]
    if let Some(dir) = &args.ocrs_models {
        use ocrsweep_document::{OcrsConfig, OcrsRecognizer};
        return Ok(Box::new(OcrsRecognizer::new(OcrsConfig::from_dir(dir))?));
    }

    let tesseract = TesseractRecognizer::new(TesseractConfig {
        binary: args.tesseract.clone(),
        ..Default::default()
    });
    if !tesseract.is_available() {
        return Err(OcrSweepError::EngineUnavailable(format!(
            "cannot run {}; install tesseract or pass --tesseract <path>",
            args.tesseract.display()
        )));
    }

    match tesseract.list_languages() {
        Ok(installed) => {
            for lang in language.split('+').map(str::trim).filter(|l| !l.is_empty()) {
                if !installed.iter().any(|known| known == lang) {
                    warn!(lang, installed = %installed.join(","), "Language pack not installed");
                }
            }
        }
        Err(err) => warn!(error = %err, "Could not list tesseract languages"),
    }

    Ok(Box::new(tesseract))
}
