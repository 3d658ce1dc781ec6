//! Input validation and grayscale conversion.
//!
//! The caller owns the decoded raster; everything downstream works on a
//! grayscale copy produced here.

use std::path::Path;

use image::{DynamicImage, GrayImage};

use crate::error::DetectError;

/// Reject images the detector cannot work with.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), DetectError> {
    if width == 0 || height == 0 {
        return Err(DetectError::invalid_image(format!(
            "zero-dimension image ({}x{})",
            width, height
        )));
    }
    Ok(())
}

/// Convert a decoded image of any channel layout into an 8-bit grayscale copy.
pub fn to_gray(image: &DynamicImage) -> Result<GrayImage, DetectError> {
    validate_dimensions(image.width(), image.height())?;
    Ok(image.to_luma8())
}

/// Decode an image from disk.
///
/// Unreadable or undecodable files surface as [`DetectError::InvalidImage`].
pub fn load_image(path: &Path) -> Result<DynamicImage, DetectError> {
    let img = image::open(path).map_err(|e| {
        DetectError::invalid_image(format!("failed to open {}: {}", path.display(), e))
    })?;
    validate_dimensions(img.width(), img.height())?;
    Ok(img)
}
