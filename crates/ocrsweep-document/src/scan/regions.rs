// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-region OCR: detect layout blocks, crop each one, and sweep it on its
// own. Results serialize to a JSON block report.

use std::path::Path;

use ocrsweep_core::config::{PreprocessConfig, RecognitionConfig};
use ocrsweep_core::error::Result;
use ocrsweep_core::Block;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::layout::LayoutBlockDetector;
use super::sweep::CandidateSweep;
use crate::image::PageImage;

/// What a region holds. Detection only produces text regions so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    #[default]
    Text,
    Table,
    Formula,
}

/// Recognised text of one layout block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionText {
    /// 1-based position in reading order.
    pub index: usize,
    pub bbox: Block,
    #[serde(rename = "type", default)]
    pub kind: RegionKind,
    #[serde(rename = "lang")]
    pub language: String,
    /// Trimmed winning text of the region's sweep.
    pub text: String,
}

/// All regions of one page image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReport {
    pub source_image: String,
    pub block_count: usize,
    pub blocks: Vec<RegionText>,
}

impl BlockReport {
    pub fn new(source_image: impl AsRef<Path>, blocks: Vec<RegionText>) -> Self {
        let source = source_image.as_ref();
        let source = std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
        Self {
            source_image: source.display().to_string(),
            block_count: blocks.len(),
            blocks,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs a [`CandidateSweep`] over every detected block of a page.
pub struct RegionExtractor<'a> {
    sweep: CandidateSweep<'a>,
    detector: LayoutBlockDetector,
    preprocess: PreprocessConfig,
    recognition: RecognitionConfig,
}

impl<'a> RegionExtractor<'a> {
    pub fn new(
        sweep: CandidateSweep<'a>,
        detector: LayoutBlockDetector,
        preprocess: PreprocessConfig,
        recognition: RecognitionConfig,
    ) -> Self {
        Self {
            sweep,
            detector,
            preprocess,
            recognition,
        }
    }

    /// Detect blocks on `page` and recognise each.
    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    pub fn extract(&self, page: &PageImage) -> Result<Vec<RegionText>> {
        let blocks = self.detector.detect(page.as_dynamic())?;
        self.extract_blocks(page, &blocks)
    }

    /// Recognise the given blocks of `page`, numbering them in slice order.
    pub fn extract_blocks(&self, page: &PageImage, blocks: &[Block]) -> Result<Vec<RegionText>> {
        let mut regions = Vec::with_capacity(blocks.len());
        for (idx, block) in blocks.iter().enumerate() {
            let crop = page.crop(block)?;
            let outcome = self
                .sweep
                .extract_best(&crop, &self.preprocess, &self.recognition)?;
            debug!(index = idx + 1, chars = outcome.text.len(), "Region recognised");

            regions.push(RegionText {
                index: idx + 1,
                bbox: *block,
                kind: RegionKind::Text,
                language: self.recognition.language.clone(),
                text: outcome.text.trim().to_string(),
            });
        }
        info!(regions = regions.len(), "Region extraction complete");
        Ok(regions)
    }

    /// Detect, recognise, and wrap the result for `source_image`.
    pub fn report(&self, source_image: impl AsRef<Path>, page: &PageImage) -> Result<BlockReport> {
        Ok(BlockReport::new(source_image, self.extract(page)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::engine::scripted::ScriptedRecognizer;
    use image::{DynamicImage, GrayImage, Luma};
    use ocrsweep_core::config::LayoutConfig;

    fn two_block_page() -> PageImage {
        let mut page = GrayImage::from_pixel(300, 200, Luma([255u8]));
        for (x0, y0) in [(40u32, 120u32), (160, 30)] {
            for y in y0..y0 + 20 {
                for x in x0..x0 + 90 {
                    page.put_pixel(x, y, Luma([0u8]));
                }
            }
        }
        PageImage::from_dynamic(DynamicImage::ImageLuma8(page)).unwrap()
    }

    fn fast_preprocess() -> PreprocessConfig {
        PreprocessConfig {
            upscale_factor: 1.0,
            denoise: false,
            ..Default::default()
        }
    }

    fn recognition() -> RecognitionConfig {
        RecognitionConfig {
            language: "kor".to_string(),
            segmentation_candidates: vec![6],
            use_structured_mode: false,
            ..Default::default()
        }
    }

    #[test]
    fn every_block_is_recognised_in_reading_order() {
        let engine = ScriptedRecognizer::new().with_text(6, "  block text \n");
        let extractor = RegionExtractor::new(
            CandidateSweep::new(&engine),
            LayoutBlockDetector::new(LayoutConfig::default()),
            fast_preprocess(),
            recognition(),
        );

        let regions = extractor.extract(&two_block_page()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].index, 1);
        assert_eq!(regions[1].index, 2);
        assert!(regions[0].bbox.y < regions[1].bbox.y);
        assert!(regions.iter().all(|r| r.text == "block text" && r.language == "kor"));
    }

    #[test]
    fn failed_engine_gives_empty_region_text() {
        let engine = ScriptedRecognizer::new();
        let extractor = RegionExtractor::new(
            CandidateSweep::new(&engine),
            LayoutBlockDetector::default(),
            fast_preprocess(),
            recognition(),
        );
        let regions = extractor
            .extract_blocks(&two_block_page(), &[Block::new(10, 10, 50, 50)])
            .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text, "");
    }

    #[test]
    fn block_outside_page_is_an_error() {
        let engine = ScriptedRecognizer::new();
        let extractor = RegionExtractor::new(
            CandidateSweep::new(&engine),
            LayoutBlockDetector::default(),
            fast_preprocess(),
            recognition(),
        );
        assert!(extractor
            .extract_blocks(&two_block_page(), &[Block::new(400, 0, 10, 10)])
            .is_err());
    }

    #[test]
    fn report_serializes_with_block_count() {
        let report = BlockReport::new(
            "/nonexistent/page-001.png",
            vec![RegionText {
                index: 1,
                bbox: Block::new(1, 2, 3, 4),
                kind: RegionKind::Text,
                language: "kor".to_string(),
                text: "안녕하세요".to_string(),
            }],
        );
        assert_eq!(report.source_image, "/nonexistent/page-001.png");

        let json = report.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["block_count"], 1);
        assert_eq!(value["blocks"][0]["lang"], "kor");
        assert_eq!(value["blocks"][0]["type"], "text");
        assert_eq!(
            value["blocks"][0]["bbox"],
            serde_json::json!({"x": 1, "y": 2, "w": 3, "h": 4})
        );
        assert_eq!(value["blocks"][0]["text"], "안녕하세요");
        assert!(json.contains("안녕하세요"));
    }

    #[test]
    fn region_kind_defaults_to_text_when_absent() {
        let region: RegionText = serde_json::from_str(
            r#"{"index": 2, "bbox": {"x": 0, "y": 5, "w": 10, "h": 4}, "lang": "eng", "text": "x"}"#,
        )
        .unwrap();
        assert_eq!(region.kind, RegionKind::Text);
        assert_eq!(region.bbox, Block::new(0, 5, 10, 4));

        let table: RegionKind = serde_json::from_str(r#""table""#).unwrap();
        assert_eq!(table, RegionKind::Table);
    }
}
