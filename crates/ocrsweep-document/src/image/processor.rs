// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page image handle — loading from disk or memory, region cropping, and PNG
// encoding. Operates on in-memory images using the `image` crate.

use image::{DynamicImage, GrayImage, ImageFormat};
use ocrsweep_core::Block;
use ocrsweep_core::error::{OcrSweepError, Result};
use tracing::{debug, info, instrument};

/// A decoded page image owned by the caller.
///
/// Every operation borrows the page and returns new pixel data; the wrapped
/// image is never modified in place.
///
/// ```ignore
/// let page = PageImage::open("page-001.png")?;
/// let region = page.crop(&Block::new(40, 60, 400, 120))?;
/// let png = encode_png(&region.to_luma8())?;
/// ```
#[derive(Debug, Clone)]
pub struct PageImage {
    image: DynamicImage,
}

impl PageImage {
    // -- Construction ---------------------------------------------------------

    /// Load a page from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            OcrSweepError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Page image loaded");
        Self::from_dynamic(img)
    }

    /// Wrap an already-decoded image. Empty images are rejected.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        ensure_not_empty(&image)?;
        Ok(Self { image })
    }

    // -- Accessors ------------------------------------------------------------

    /// Width in pixels, never zero.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels, never zero.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The decoded image, in whatever colour type it was loaded with.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Regions --------------------------------------------------------------

    /// Copy out the pixels under `block`, clamped to the page bounds.
    ///
    /// Fails when the block lies entirely outside the page.
    pub fn crop(&self, block: &Block) -> Result<DynamicImage> {
        let img_w = self.image.width();
        let img_h = self.image.height();

        if block.x >= img_w || block.y >= img_h || block.width == 0 || block.height == 0 {
            return Err(OcrSweepError::ImageError(format!(
                "region {}x{}+{}+{} lies outside the {}x{} page",
                block.width, block.height, block.x, block.y, img_w, img_h
            )));
        }

        let safe_w = block.width.min(img_w - block.x);
        let safe_h = block.height.min(img_h - block.y);
        debug!(
            x = block.x,
            y = block.y,
            safe_w,
            safe_h,
            "Cropping page region"
        );

        Ok(self.image.crop_imm(block.x, block.y, safe_w, safe_h))
    }
}

/// Reject images with no pixels; every pipeline stage assumes at least one.
pub(crate) fn ensure_not_empty(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrSweepError::ImageError(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Encode a grayscale image as PNG, the hand-off format for external engines.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
    encode_to_format(&DynamicImage::ImageLuma8(image.clone()), ImageFormat::Png)
}

fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        OcrSweepError::ImageError(format!("image encoding failed: {}", err))
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};

    #[test]
    fn empty_image_is_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        assert!(matches!(
            PageImage::from_dynamic(img),
            Err(OcrSweepError::ImageError(_))
        ));
    }

    #[test]
    fn crop_is_clamped_to_page_bounds() {
        let page =
            PageImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(100, 80))).unwrap();
        let region = page.crop(&Block::new(90, 70, 50, 50)).unwrap();
        assert_eq!((region.width(), region.height()), (10, 10));
    }

    #[test]
    fn crop_outside_page_fails() {
        let page =
            PageImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(100, 80))).unwrap();
        assert!(page.crop(&Block::new(100, 0, 5, 5)).is_err());
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let gray = GrayImage::from_pixel(37, 21, Luma([200u8]));
        let bytes = encode_png(&gray).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(decoded, gray);
    }

    #[test]
    fn saved_page_opens_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        GrayImage::from_pixel(12, 9, Luma([40u8])).save(&path).unwrap();

        let page = PageImage::open(&path).unwrap();
        assert_eq!((page.width(), page.height()), (12, 9));
    }

    #[test]
    fn unreadable_file_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            PageImage::open(&path),
            Err(OcrSweepError::ImageError(_))
        ));
    }
}
