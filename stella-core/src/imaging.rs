//! Screenshot preprocessing before OCR.
//!
//! Relic screenshots have light text on a dark, busy background. Turning
//! them into dark text on a light background with a bit of extra contrast
//! gives the OCR tool much cleaner stat lines.

use crate::error::{Result, StellaError};
use image::{DynamicImage, GrayImage, imageops};
use std::path::Path;

/// Linear contrast multiplier applied after inversion.
pub const SCAN_CONTRAST: f32 = 1.3;

/// Greyscale, invert, then scale every pixel by [`SCAN_CONTRAST`],
/// clamped to the 8-bit range.
pub fn preprocess_image(image: &DynamicImage) -> GrayImage {
    let mut gray = image.to_luma8();
    imageops::invert(&mut gray);
    for pixel in gray.pixels_mut() {
        let scaled = f32::from(pixel.0[0]) * SCAN_CONTRAST;
        pixel.0[0] = scaled.round().clamp(0.0, 255.0) as u8;
    }
    gray
}

/// Load a screenshot and prepare it for OCR.
pub fn preprocess_scan_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(StellaError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Screenshot not found: {}", path.display()),
        )));
    }

    let image = image::open(path)?;
    tracing::debug!(
        "Preprocessing {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(DynamicImage::ImageLuma8(preprocess_image(&image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_preprocess_inverts_and_stretches() {
        let source = GrayImage::from_fn(3, 1, |x, _| match x {
            0 => Luma([0]),
            1 => Luma([155]),
            _ => Luma([255]),
        });
        let processed = preprocess_image(&DynamicImage::ImageLuma8(source));

        // black clips to white, white stays black
        assert_eq!(processed.get_pixel(0, 0).0[0], 255);
        assert_eq!(processed.get_pixel(1, 0).0[0], 130);
        assert_eq!(processed.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn test_preprocess_scan_image_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(4, 2, Rgb([255, 255, 255])).save(&path).unwrap();

        let processed = preprocess_scan_image(&path).unwrap();
        assert_eq!((processed.width(), processed.height()), (4, 2));
        let gray = processed.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_preprocess_scan_image_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = preprocess_scan_image(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, StellaError::Io(_)));
    }
}
