// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normalization pipeline — grayscale, upscaling, non-local means
// denoising, adaptive/Otsu binarization, rule-line suppression, and deskew.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use ocrsweep_core::PreprocessConfig;
use ocrsweep_core::error::Result;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::image::processor::ensure_not_empty;
use crate::scan::morphology;

/// Runs the configured conditioning stages over a page image.
///
/// Deterministic and free of shared state: the same image and config always
/// produce the same output, and the caller's image is only read.
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    config: PreprocessConfig,
}

impl ImageNormalizer {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Condition `image` for recognition.
    ///
    /// Stages run strictly in order, each optional per config:
    ///
    /// 1. Luminance conversion
    /// 2. Cubic upscaling (skipped for factors `<= 1.0`)
    /// 3. Non-local means denoising
    /// 4. Adaptive (Gaussian) or global (Otsu) binarization
    /// 5. Rule-line suppression (binarized output only)
    /// 6. Deskew (binarized output only)
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn normalize(&self, image: &DynamicImage) -> Result<GrayImage> {
        ensure_not_empty(image)?;
        self.config.validate()?;
        let cfg = &self.config;

        let mut enhancer = ScanEnhancer::from_dynamic(image).upscale(cfg.upscale_factor);

        if cfg.denoise {
            enhancer = enhancer.denoise(
                cfg.denoise_strength,
                cfg.denoise_template_window,
                cfg.denoise_search_window,
            );
        }

        if cfg.binarize {
            enhancer = if cfg.adaptive_threshold {
                enhancer.binarize_adaptive(cfg.adaptive_block_size, cfg.adaptive_offset)
            } else {
                enhancer.binarize_otsu()
            };
            if cfg.remove_table_lines {
                enhancer = enhancer.remove_rule_lines(cfg.inpaint_radius);
            }
            if cfg.deskew {
                enhancer = enhancer.deskew(cfg.min_deskew_angle);
            }
        } else if cfg.remove_table_lines || cfg.deskew {
            debug!("Line removal and deskew need a binarized page; skipping");
        }

        let normalized = enhancer.into_gray();
        info!(
            width = normalized.width(),
            height = normalized.height(),
            "Page normalized"
        );
        Ok(normalized)
    }
}

/// Chainable single-channel conditioning stages.
///
/// Each method consumes `self` and returns the transformed page.
pub struct ScanEnhancer {
    image: GrayImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Start from any page image, reducing it to luminance.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_luma8(),
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    // -- Resampling -----------------------------------------------------------

    /// Scale both axes by `factor` with Catmull-Rom (cubic) filtering.
    pub fn upscale(self, factor: f32) -> Self {
        if factor <= 1.0 {
            return self;
        }
        let (w, h) = self.image.dimensions();
        let new_w = ((w as f32 * factor) as u32).max(1);
        let new_h = ((h as f32 * factor) as u32).max(1);
        debug!(from_w = w, from_h = h, new_w, new_h, "Upscaling page");
        Self {
            image: image::imageops::resize(&self.image, new_w, new_h, FilterType::CatmullRom),
        }
    }

    // -- Denoising ------------------------------------------------------------

    /// Non-local means denoising.
    ///
    /// Every pixel becomes a weighted mean of the pixels in its
    /// `search_window` neighbourhood, each weighted by how similar the
    /// surrounding `template_window` patches are: `exp(-d / strength²)` with
    /// `d` the mean squared patch difference rounded to an integer, read from
    /// a lookup table. Patch distances for one search offset come from a row
    /// pass and a column pass of box sums, both parallel over rows.
    #[instrument(skip(self))]
    pub fn denoise(self, strength: f32, template_window: u32, search_window: u32) -> Self {
        info!("Applying non-local means denoising");

        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return self;
        }
        let (w, h) = (width as usize, height as usize);
        let radius = (template_window / 2) as usize;
        let search_radius = (search_window / 2) as isize;
        let weights = PatchWeights::new(strength);
        let src = self.image.as_raw();

        // Reciprocal of the template columns inside the image at each x.
        let column_scale: Vec<f32> = (0..w)
            .map(|x| {
                let (lo, hi) = span(x, radius, w);
                1.0 / (hi - lo) as f32
            })
            .collect();

        let mut weight_sums = vec![0f32; w * h];
        let mut value_sums = vec![0f32; w * h];
        let mut row_sums = vec![0u32; w * h];

        for dy in -search_radius..=search_radius {
            let source_rows = clamped_offsets(h, dy);
            for dx in -search_radius..=search_radius {
                let source_cols = clamped_offsets(w, dx);

                row_sums.par_chunks_mut(w).enumerate().for_each_init(
                    || vec![0u64; w + 1],
                    |prefix, (y, out)| {
                        let row = &src[y * w..(y + 1) * w];
                        let shifted = &src[source_rows[y] * w..(source_rows[y] + 1) * w];
                        for x in 0..w {
                            let diff = row[x] as i32 - shifted[source_cols[x]] as i32;
                            prefix[x + 1] = prefix[x] + (diff * diff) as u64;
                        }
                        for (x, sum) in out.iter_mut().enumerate() {
                            let (lo, hi) = span(x, radius, w);
                            *sum = (prefix[hi] - prefix[lo]) as u32;
                        }
                    },
                );

                let row_sums = &row_sums;
                weight_sums
                    .par_chunks_mut(w)
                    .zip(value_sums.par_chunks_mut(w))
                    .enumerate()
                    .for_each_init(
                        || vec![0u32; w],
                        |patch_sums, (y, (weight_row, value_row))| {
                            let (top, bottom) = span(y, radius, h);
                            patch_sums.fill(0);
                            for band in row_sums[top * w..bottom * w].chunks_exact(w) {
                                for (sum, &v) in patch_sums.iter_mut().zip(band) {
                                    *sum += v;
                                }
                            }

                            let row_scale = 1.0 / (bottom - top) as f32;
                            let shifted = &src[source_rows[y] * w..(source_rows[y] + 1) * w];
                            for x in 0..w {
                                let mean = patch_sums[x] as f32 * row_scale * column_scale[x];
                                let weight = weights.lookup((mean + 0.5) as u32);
                                weight_row[x] += weight;
                                value_row[x] += weight * shifted[source_cols[x]] as f32;
                            }
                        },
                    );
            }
        }

        let output = GrayImage::from_fn(width, height, |x, y| {
            let idx = y as usize * w + x as usize;
            let value = value_sums[idx] / weight_sums[idx];
            Luma([value.round().clamp(0.0, 255.0) as u8])
        });

        debug!("Denoising complete");
        Self { image: output }
    }

    // -- Binarization ---------------------------------------------------------

    /// Gaussian-weighted local thresholding.
    ///
    /// A pixel turns white when it is brighter than the Gaussian-weighted
    /// mean of its `block_size` neighbourhood minus `offset`, and black
    /// otherwise. Robust against uneven illumination and scan shading.
    #[instrument(skip(self))]
    pub fn binarize_adaptive(self, block_size: u32, offset: i32) -> Self {
        info!(block_size, offset, "Applying adaptive binarization");
        Self {
            image: adaptive_threshold_gaussian(&self.image, block_size, offset, false),
        }
    }

    /// Global binarization at the Otsu threshold.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        info!("Applying Otsu binarization");

        let threshold = otsu_threshold(&self.image);
        debug!(threshold, "Otsu threshold computed");

        let (width, height) = self.image.dimensions();
        let mut output = GrayImage::new(width, height);

        for y in 0..height {
            for x in 0..width {
                let val = self.image.get_pixel(x, y).0[0];
                let binary = if val > threshold { 255u8 } else { 0u8 };
                output.put_pixel(x, y, Luma([binary]));
            }
        }

        Self { image: output }
    }

    // -- Rule-line suppression ------------------------------------------------

    /// Remove long horizontal and vertical rules from a binarized page.
    ///
    /// Rules are runs of ink at least `max(10, width / 100)` pixels long
    /// horizontally or `max(10, height / 100)` vertically. They are repaired
    /// by inpainting from the surrounding pixels rather than blanked, so
    /// glyph strokes that touch a rule keep their shape.
    #[instrument(skip(self))]
    pub fn remove_rule_lines(self, inpaint_radius: u32) -> Self {
        let (width, height) = self.image.dimensions();
        let horizontal_len = (width / 100).max(10);
        let vertical_len = (height / 100).max(10);

        // Ink becomes foreground.
        let inverted = invert(&self.image);
        let ink = GrayImage::from_fn(width, height, |x, y| {
            Luma([if inverted.get_pixel(x, y).0[0] > 127 { 255 } else { 0 }])
        });

        let lines = morphology::union(
            &morphology::open_horizontal(&ink, horizontal_len),
            &morphology::open_vertical(&ink, vertical_len),
        );
        let line_pixels = morphology::count_on(&lines);
        info!(
            horizontal_len,
            vertical_len, line_pixels, "Suppressing rule lines"
        );

        if line_pixels == 0 {
            return self;
        }

        let repaired = morphology::inpaint(&inverted, &lines, inpaint_radius);
        Self {
            image: invert(&repaired),
        }
    }

    // -- Deskew ---------------------------------------------------------------

    /// Rotate a binarized page so its ink is axis aligned.
    ///
    /// Corrections smaller than `min_angle` degrees are skipped. Pages whose
    /// ink is not text-shaped can come out worse.
    #[instrument(skip(self))]
    pub fn deskew(self, min_angle: f32) -> Self {
        let Some(angle) = skew_angle(&self.image) else {
            debug!("No ink found; skipping deskew");
            return self;
        };

        if angle.abs() < min_angle {
            debug!(angle, "Skew below threshold; skipping");
            return self;
        }

        info!(angle, "Correcting skew");
        Self {
            image: rotate_replicate(&self.image, -angle),
        }
    }
}

// -- Thresholding helpers -----------------------------------------------------

/// Gaussian-weighted adaptive threshold.
///
/// The weighting sigma follows the usual derivation from the block size,
/// `0.3 * ((block_size - 1) / 2 - 1) + 0.8`. With `invert` set, ink comes out
/// white on black.
pub fn adaptive_threshold_gaussian(
    gray: &GrayImage,
    block_size: u32,
    offset: i32,
    invert: bool,
) -> GrayImage {
    let sigma = (0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8).max(0.1);
    let local = gaussian_blur_f32(gray, sigma);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0] as i32;
        let threshold = local.get_pixel(x, y).0[0] as i32 - offset;
        let bright = value > threshold;
        Luma([if bright != invert { 255 } else { 0 }])
    })
}

fn invert(image: &GrayImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([255 - image.get_pixel(x, y).0[0]])
    })
}

// -- Denoising helpers --------------------------------------------------------

/// Largest mean squared difference between two 8-bit patches.
const MAX_PATCH_DISTANCE: usize = 255 * 255;

/// `exp(-d / strength²)` for every integer patch distance `d`.
struct PatchWeights(Vec<f32>);

impl PatchWeights {
    fn new(strength: f32) -> Self {
        let h2 = strength * strength;
        Self(
            (0..=MAX_PATCH_DISTANCE)
                .map(|d| (-(d as f32) / h2).exp())
                .collect(),
        )
    }

    fn lookup(&self, distance: u32) -> f32 {
        self.0[(distance as usize).min(MAX_PATCH_DISTANCE)]
    }
}

/// Source index of every position along an axis of length `len` shifted by
/// `offset`, clamped to the axis.
fn clamped_offsets(len: usize, offset: isize) -> Vec<usize> {
    let last = len as isize - 1;
    (0..len as isize)
        .map(|i| (i + offset).clamp(0, last) as usize)
        .collect()
}

/// Half-open range `[lo, hi)` within `radius` of `pos`, clipped to `0..len`.
fn span(pos: usize, radius: usize, len: usize) -> (usize, usize) {
    (pos.saturating_sub(radius), (pos + radius + 1).min(len))
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Picks the level that maximises the between-class variance of the dark
/// and light pixel groups. Pixels above the level are the light class.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

// -- Skew helpers -------------------------------------------------------------

/// Skew of the ink on a binarized page, in degrees within (-45, 45].
///
/// Positive values mean the ink is rotated clockwise (in image coordinates,
/// with y pointing down). Taken from the minimum-area rectangle around all
/// dark pixels. `None` when there is not enough ink to fit a rectangle.
pub fn skew_angle(binary: &GrayImage) -> Option<f32> {
    let points: Vec<Point<i32>> = binary
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] < 128)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();

    if points.len() < 3 {
        return None;
    }

    let corners = min_area_rect(&points);
    let edge_angle = |a: Point<i32>, b: Point<i32>| -> Option<f32> {
        let dx = (b.x - a.x) as f32;
        let dy = (b.y - a.y) as f32;
        if dx == 0.0 && dy == 0.0 {
            None
        } else {
            Some(dy.atan2(dx).to_degrees())
        }
    };

    let raw = edge_angle(corners[0], corners[1]).or_else(|| edge_angle(corners[1], corners[2]))?;
    let angle = normalize_skew(raw);
    debug!(raw, angle, "Minimum-area rectangle angle");
    Some(angle)
}

/// Fold any rectangle edge angle into (-45, 45].
fn normalize_skew(degrees: f32) -> f32 {
    let mut angle = degrees % 90.0;
    if angle > 45.0 {
        angle -= 90.0;
    } else if angle <= -45.0 {
        angle += 90.0;
    }
    angle
}

/// Rotate clockwise by `degrees` about the image centre, keeping the canvas
/// size. Samples outside the source repeat the nearest edge pixel.
fn rotate_replicate(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = (cx + dx * cos + dy * sin).clamp(0.0, max_x);
        let sy = (cy - dx * sin + dy * cos).clamp(0.0, max_y);
        Luma([sample_bilinear(image, sx, sy)])
    })
}

fn sample_bilinear(image: &GrayImage, x: f32, y: f32) -> u8 {
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p = |px: u32, py: u32| image.get_pixel(px, py).0[0] as f32;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

// -- Tests --------------------------------------------------------------------
