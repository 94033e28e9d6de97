// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binary morphology on foreground masks (non-zero = foreground) with
// rectangular structuring elements, plus mask-guided inpainting.

use image::{GrayImage, Luma};
use imageproc::map::map_colors2;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

const ON: u8 = 255;

/// Longest structuring element side. `Mask` anchors are `u8` offsets into a
/// mask image narrower than 512 pixels.
const MAX_ELEMENT_LENGTH: u32 = 511;

fn is_on(value: u8) -> bool {
    value != 0
}

/// `length x 1` row of foreground anchored at column `anchor`.
fn row_element(length: u32, anchor: u32) -> Mask {
    Mask::from_image(&GrayImage::from_pixel(length, 1, Luma([ON])), anchor as u8, 0)
}

/// `1 x length` column of foreground anchored at row `anchor`.
fn column_element(length: u32, anchor: u32) -> Mask {
    Mask::from_image(&GrayImage::from_pixel(1, length, Luma([ON])), 0, anchor as u8)
}

fn element_length(length: u32) -> u32 {
    length.clamp(1, MAX_ELEMENT_LENGTH)
}

// -- Opening ------------------------------------------------------------------

/// Opening with a `1 x length` horizontal line.
///
/// For a binary mask this keeps the horizontal foreground runs that are at
/// least `length` pixels long. Pixels beyond the image edge never break a
/// run, so a shorter run touching the border survives.
pub fn open_horizontal(mask: &GrayImage, length: u32) -> GrayImage {
    let length = element_length(length);
    let anchor = length / 2;
    // Dilating with the reflected element makes erode-then-dilate a true
    // opening for even lengths too.
    let eroded = grayscale_erode(mask, &row_element(length, anchor));
    grayscale_dilate(&eroded, &row_element(length, length - 1 - anchor))
}

/// Opening with a `length x 1` vertical line.
pub fn open_vertical(mask: &GrayImage, length: u32) -> GrayImage {
    let length = element_length(length);
    let anchor = length / 2;
    let eroded = grayscale_erode(mask, &column_element(length, anchor));
    grayscale_dilate(&eroded, &column_element(length, length - 1 - anchor))
}

// -- Dilation -----------------------------------------------------------------

/// Dilate with a `kernel_w x kernel_h` rectangle anchored at its centre.
///
/// A rectangle is separable, so this runs a row pass then a column pass
/// instead of one pass over every element of the rectangle.
pub fn dilate_rect(mask: &GrayImage, kernel_w: u32, kernel_h: u32) -> GrayImage {
    let kernel_w = element_length(kernel_w);
    let kernel_h = element_length(kernel_h);
    let rows = grayscale_dilate(mask, &row_element(kernel_w, kernel_w / 2));
    grayscale_dilate(&rows, &column_element(kernel_h, kernel_h / 2))
}

/// Pixel-wise OR of two masks of equal size.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    map_colors2(a, b, |p, q| {
        Luma([if is_on(p.0[0]) || is_on(q.0[0]) { ON } else { 0 }])
    })
}

/// Number of foreground pixels in a mask.
pub fn count_on(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| is_on(p.0[0])).count()
}

// -- Inpainting ---------------------------------------------------------------

/// Fill the pixels selected by `mask` from their surroundings.
///
/// Onion-peel diffusion: each round, every masked pixel that has known
/// pixels within `radius` takes their distance-weighted mean and becomes
/// known for the next round. Masked pixels with no known pixel anywhere keep
/// their original value.
pub fn inpaint(image: &GrayImage, mask: &GrayImage, radius: u32) -> GrayImage {
    debug_assert_eq!(image.dimensions(), mask.dimensions());
    let (width, height) = image.dimensions();
    let radius = radius.max(1) as i64;

    let mut out = image.clone();
    let mut known: Vec<bool> = mask.pixels().map(|p| !is_on(p.0[0])).collect();
    let mut pending: Vec<(u32, u32)> = mask
        .enumerate_pixels()
        .filter(|(_, _, p)| is_on(p.0[0]))
        .map(|(x, y, _)| (x, y))
        .collect();

    while !pending.is_empty() {
        let mut filled = Vec::new();

        for &(x, y) in &pending {
            let mut weight_sum = 0.0f64;
            let mut value_sum = 0.0f64;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    if !known[ny as usize * width as usize + nx as usize] {
                        continue;
                    }
                    let dist2 = (dx * dx + dy * dy) as f64;
                    if dist2 > (radius * radius) as f64 {
                        continue;
                    }
                    let weight = 1.0 / dist2;
                    weight_sum += weight;
                    value_sum += weight * out.get_pixel(nx as u32, ny as u32).0[0] as f64;
                }
            }
            if weight_sum > 0.0 {
                filled.push((x, y, (value_sum / weight_sum).round().clamp(0.0, 255.0) as u8));
            }
        }

        if filled.is_empty() {
            break;
        }

        for &(x, y, value) in &filled {
            out.put_pixel(x, y, Luma([value]));
            known[y as usize * width as usize + x as usize] = true;
        }
        pending.retain(|&(x, y)| !known[y as usize * width as usize + x as usize]);
    }

    out
}
