// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coarse page segmentation into rectangular text/table/formula regions, and a
// debug rendering of the detected regions.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use ocrsweep_core::config::LayoutConfig;
use ocrsweep_core::error::Result;
use ocrsweep_core::Block;
use tracing::{debug, info, instrument};

use crate::image::processor::ensure_not_empty;
use crate::scan::enhance::adaptive_threshold_gaussian;
use crate::scan::morphology;

/// Segments a page into blocks by fusing nearby ink into solid blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutBlockDetector {
    config: LayoutConfig,
}

impl LayoutBlockDetector {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Detect blocks in reading order (top, then left).
    ///
    /// 1. Inverse adaptive binarization (ink becomes foreground)
    /// 2. Dilation with the merge kernel, fusing glyphs and cells
    /// 3. External contours of the fused mask
    /// 4. Bounding boxes, dropping those below `min_area`
    ///
    /// A page with no surviving region yields an empty list, not an error.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Block>> {
        ensure_not_empty(image)?;
        self.config.validate()?;
        let cfg = &self.config;

        let gray = image.to_luma8();
        let ink = adaptive_threshold_gaussian(&gray, cfg.block_size, cfg.offset, true);
        let (kernel_w, kernel_h) = cfg.merge_kernel;
        let fused = morphology::dilate_rect(&ink, kernel_w, kernel_h);

        let contours = find_contours::<i32>(&fused);
        let mut blocks: Vec<Block> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| bounding_box(&c.points))
            .collect();
        let found = blocks.len();

        blocks.retain(|block| block.area() >= cfg.min_area);
        blocks.sort_by_key(Block::reading_order_key);

        debug!(found, kept = blocks.len(), min_area = cfg.min_area, "Block area filter");
        info!(blocks = blocks.len(), "Layout blocks detected");
        Ok(blocks)
    }
}

/// Detect blocks with the default thresholding settings.
pub fn detect_blocks(
    image: &DynamicImage,
    min_area: u64,
    merge_kernel: (u32, u32),
) -> Result<Vec<Block>> {
    LayoutBlockDetector::new(LayoutConfig {
        min_area,
        merge_kernel,
        ..Default::default()
    })
    .detect(image)
}

/// Axis-aligned box enclosing a contour, inclusive of its edge pixels.
fn bounding_box(points: &[imageproc::point::Point<i32>]) -> Option<Block> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Block::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

// -- Annotation ---------------------------------------------------------------

const BOX_COLOR: Rgb<u8> = Rgb([255, 128, 0]);
const LABEL_SCALE: u32 = 2;

/// 3x5 digit glyphs, one row per byte, most significant of the low 3 bits on
/// the left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Copy of `image` with each block outlined and numbered from 1.
///
/// Labels sit just above their box, or inside its top edge when the box
/// touches the top of the page.
pub fn annotate(image: &DynamicImage, blocks: &[Block]) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for (idx, block) in blocks.iter().enumerate() {
        if block.width == 0 || block.height == 0 {
            continue;
        }
        let outer = Rect::at(block.x as i32, block.y as i32).of_size(block.width, block.height);
        draw_hollow_rect_mut(&mut canvas, outer, BOX_COLOR);
        if block.width > 2 && block.height > 2 {
            let inner = Rect::at(block.x as i32 + 1, block.y as i32 + 1)
                .of_size(block.width - 2, block.height - 2);
            draw_hollow_rect_mut(&mut canvas, inner, BOX_COLOR);
        }

        let label_h = 5 * LABEL_SCALE;
        let label_y = if block.y >= label_h + 2 {
            block.y - label_h - 2
        } else {
            block.y + 3
        };
        draw_number(&mut canvas, idx + 1, block.x as i64, label_y as i64);
    }

    canvas
}

fn draw_number(canvas: &mut RgbImage, number: usize, x: i64, y: i64) {
    let advance = (4 * LABEL_SCALE) as i64;
    for (pos, ch) in number.to_string().chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else { continue };
        draw_digit(canvas, digit as usize, x + pos as i64 * advance, y);
    }
}

fn draw_digit(canvas: &mut RgbImage, digit: usize, x: i64, y: i64) {
    let scale = LABEL_SCALE as i64;
    for (row, bits) in DIGITS[digit].iter().enumerate() {
        for col in 0..3i64 {
            if bits & (0b100 >> col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + col * scale + dx;
                    let py = y + row as i64 * scale + dy;
                    if px >= 0
                        && py >= 0
                        && px < canvas.width() as i64
                        && py < canvas.height() as i64
                    {
                        canvas.put_pixel(px as u32, py as u32, BOX_COLOR);
                    }
                }
            }
        }
    }
}
