// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestration: input discovery, per-page extraction with per-page
// error isolation, and output formatting.

use std::fs;
use std::path::{Path, PathBuf};

use ocrsweep_core::{ExtractorConfig, OcrSweepError};
use ocrsweep_core::error::Result;
use ocrsweep_document::scan::layout::annotate;
use ocrsweep_document::{
    BlockReport, CandidateSweep, LayoutBlockDetector, PageImage, RegionExtractor, SweepOutcome,
    TextRecognizer,
};
use tracing::{error, info, instrument, warn};

/// Scores shown per page with `--debug`.
const TOP_SCORES: usize = 5;

const PAGE_RULE_WIDTH: usize = 80;

/// Extracted text of one input image.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub path: PathBuf,
    pub text: String,
}

/// Expand directories into the images they contain (matching `ext`, sorted
/// by name). Plain file arguments are kept as given.
pub fn collect_inputs(inputs: &[PathBuf], ext: &str) -> Result<Vec<PathBuf>> {
    let ext = ext.trim_start_matches('.');
    let mut pages = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            pages.push(input.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = fs::read_dir(input)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
            })
            .collect();
        found.sort();

        if found.is_empty() {
            warn!(dir = %input.display(), ext, "No matching images in directory");
        }
        pages.extend(found);
    }

    Ok(pages)
}

/// Runs whole-page or per-block extraction over a batch of images.
pub struct BatchExtractor<'a> {
    recognizer: &'a dyn TextRecognizer,
    config: &'a ExtractorConfig,
    show_scores: bool,
}

impl<'a> BatchExtractor<'a> {
    pub fn new(recognizer: &'a dyn TextRecognizer, config: &'a ExtractorConfig) -> Self {
        Self {
            recognizer,
            config,
            show_scores: false,
        }
    }

    /// Log the best candidate scores of every page.
    pub fn with_score_log(mut self, enabled: bool) -> Self {
        self.show_scores = enabled;
        self
    }

    fn sweep(&self) -> CandidateSweep<'a> {
        CandidateSweep::new(self.recognizer).with_weights(self.config.scoring)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn extract_page(&self, path: &Path) -> Result<SweepOutcome> {
        let page = PageImage::open(path)?;
        let outcome = self.sweep().extract_best(
            page.as_dynamic(),
            &self.config.preprocess,
            &self.config.recognition,
        )?;

        if self.show_scores {
            let top = outcome
                .ranked()
                .into_iter()
                .take(TOP_SCORES)
                .map(|(key, score)| format!("{key}:{score:.3}"))
                .collect::<Vec<_>>()
                .join(", ");
            info!(scores = %top, "Top candidate scores");
        }
        Ok(outcome)
    }

    /// Extract every page. A page that fails is logged and yields empty text.
    pub fn extract_pages(&self, paths: &[PathBuf]) -> Vec<PageText> {
        info!(
            pages = paths.len(),
            language = %self.config.recognition.language,
            "Starting text extraction"
        );

        let mut results = Vec::with_capacity(paths.len());
        for (idx, path) in paths.iter().enumerate() {
            info!(page = idx + 1, of = paths.len(), path = %path.display(), "Processing page");
            let text = match self.extract_page(path) {
                Ok(outcome) => {
                    info!(chars = outcome.text.chars().count(), "Text extracted");
                    outcome.text
                }
                Err(err) => {
                    error!(path = %path.display(), error = %err, "Page extraction failed");
                    String::new()
                }
            };
            results.push(PageText {
                path: path.clone(),
                text,
            });
        }
        results
    }

    /// Detect and recognise the layout blocks of one page, optionally saving
    /// an annotated copy into `annotate_dir`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn block_report(&self, path: &Path, annotate_dir: Option<&Path>) -> Result<BlockReport> {
        let page = PageImage::open(path)?;
        let detector = LayoutBlockDetector::new(self.config.layout);
        let blocks = detector.detect(page.as_dynamic())?;

        if let Some(dir) = annotate_dir {
            let target = dir.join(annotated_name(path));
            fs::create_dir_all(dir)?;
            annotate(page.as_dynamic(), &blocks).save(&target).map_err(|err| {
                OcrSweepError::ImageError(format!(
                    "failed to save {}: {}",
                    target.display(),
                    err
                ))
            })?;
            info!(path = %target.display(), "Annotated page written");
        }

        let extractor = RegionExtractor::new(
            self.sweep(),
            detector,
            self.config.preprocess.clone(),
            self.config.recognition.clone(),
        );
        let regions = extractor.extract_blocks(&page, &blocks)?;
        Ok(BlockReport::new(path, regions))
    }

    /// Block reports for every page. A page that fails yields an empty report.
    pub fn block_reports(&self, paths: &[PathBuf], annotate_dir: Option<&Path>) -> Vec<BlockReport> {
        paths
            .iter()
            .map(|path| {
                self.block_report(path, annotate_dir).unwrap_or_else(|err| {
                    error!(path = %path.display(), error = %err, "Block extraction failed");
                    BlockReport::new(path, Vec::new())
                })
            })
            .collect()
    }
}

/// `<stem>_blocks.png`
fn annotated_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    format!("{stem}_blocks.png")
}

/// Text output: pages ordered by path, each under a ruled header.
pub fn format_pages(pages: &[PageText]) -> String {
    let mut sorted: Vec<&PageText> = pages.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let rule = "=".repeat(PAGE_RULE_WIDTH);
    let mut out = String::new();
    for (idx, page) in sorted.iter().enumerate() {
        let name = page
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| page.path.display().to_string());
        out.push_str(&format!("{rule}\nPage {}: {name}\n{rule}\n\n", idx + 1));
        out.push_str(&page.text);
        out.push_str("\n\n\n");
    }
    out
}

/// Write to `path`, creating parent directories, or print to stdout.
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
            info!(path = %path.display(), bytes = contents.len(), "Output written");
        }
        None => print!("{contents}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use ocrsweep_core::{OcrSweepError, WordToken};
    use ocrsweep_document::RecognitionParams;

    /// Returns the same text for every call.
    struct FixedRecognizer(&'static str);

    impl TextRecognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize_text(&self, _: &GrayImage, _: &RecognitionParams) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn recognize_words(&self, _: &GrayImage, _: &RecognitionParams) -> Result<Vec<WordToken>> {
            Err(OcrSweepError::OcrError("words unsupported".to_string()))
        }
    }

    fn fast_config() -> ExtractorConfig {
        let mut config = ExtractorConfig::default();
        config.preprocess.upscale_factor = 1.0;
        config.preprocess.denoise = false;
        config.recognition.segmentation_candidates = vec![6];
        config
    }

    fn write_page(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut page = GrayImage::from_pixel(120, 80, Luma([255u8]));
        for y in 30..44 {
            for x in 20..100 {
                page.put_pixel(x, y, Luma([0u8]));
            }
        }
        page.save(&path).unwrap();
        path
    }

    #[test]
    fn directories_expand_to_sorted_matching_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.PNG", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let loose = PathBuf::from("loose.jpg");

        let inputs = collect_inputs(&[dir.path().to_path_buf(), loose.clone()], ".png").unwrap();
        assert_eq!(
            inputs,
            vec![dir.path().join("a.PNG"), dir.path().join("b.png"), loose]
        );
    }

    #[test]
    fn failing_page_contributes_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_page(dir.path(), "good.png");
        let missing = dir.path().join("missing.png");

        let engine = FixedRecognizer("recognised words");
        let config = fast_config();
        let pages = BatchExtractor::new(&engine, &config)
            .with_score_log(true)
            .extract_pages(&[missing.clone(), good.clone()]);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], PageText { path: missing, text: String::new() });
        assert_eq!(pages[1], PageText { path: good, text: "recognised words".to_string() });
    }

    #[test]
    fn block_report_covers_detected_regions_and_annotates() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), "scan.png");
        let annotated = dir.path().join("annotated");

        let engine = FixedRecognizer(" cell ");
        let config = fast_config();
        let report = BatchExtractor::new(&engine, &config)
            .block_report(&page, Some(&annotated))
            .unwrap();

        assert_eq!(report.block_count, 1);
        assert_eq!(report.blocks[0].text, "cell");
        assert!(annotated.join("scan_blocks.png").is_file());
    }

    #[test]
    fn unreadable_page_gives_empty_block_report() {
        let engine = FixedRecognizer("unused");
        let config = fast_config();
        let reports = BatchExtractor::new(&engine, &config)
            .block_reports(&[PathBuf::from("/nonexistent/page.png")], None);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].block_count, 0);
    }

    #[test]
    fn pages_are_formatted_in_path_order() {
        let pages = vec![
            PageText { path: PathBuf::from("out/p2.png"), text: "second".to_string() },
            PageText { path: PathBuf::from("out/p1.png"), text: "first".to_string() },
        ];
        let rule = "=".repeat(80);
        let expected = format!(
            "{rule}\nPage 1: p1.png\n{rule}\n\nfirst\n\n\n{rule}\nPage 2: p2.png\n{rule}\n\nsecond\n\n\n"
        );
        assert_eq!(format_pages(&pages), expected);
    }

    #[test]
    fn output_file_parents_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/text.txt");
        write_output(Some(&target), "hello").unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), "hello");
    }
}
