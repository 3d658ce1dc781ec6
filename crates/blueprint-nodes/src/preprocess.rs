//! Working-copy derivation: blurred grayscale, cleaned foreground mask, edge map.
//!
//! The input grayscale is never modified. Both pre-analysis and circle
//! detection read from the same [`PreprocessedImage`], so the expensive
//! variants are computed once per loaded image.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;

use crate::config::PreprocessConfig;

const FOREGROUND: u8 = 255;

/// All derived variants of one input image.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// Input width (px).
    pub width: u32,
    /// Input height (px).
    pub height: u32,
    /// Gaussian-blurred grayscale; input of the first detection pass.
    pub blurred: GrayImage,
    /// Adaptive inverse-threshold mask after close/open cleanup; input of the
    /// contour analysis and of the second detection pass.
    pub mask: GrayImage,
    /// Binary Canny edge map of the blurred variant.
    pub edges: GrayImage,
}

impl PreprocessedImage {
    /// Image dimensions `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Derive every working variant from a grayscale image.
pub fn preprocess(gray: &GrayImage, config: &PreprocessConfig) -> PreprocessedImage {
    let blurred = imageproc::filter::gaussian_blur_f32(gray, config.blur_sigma);
    let edges = imageproc::edges::canny(&blurred, config.edge_low, config.edge_high);
    let raw_mask = adaptive_threshold_inv(gray, config.threshold_sigma, config.threshold_offset);
    let mask = close_then_open(&raw_mask, config.morph_radius);
    tracing::debug!(
        width = gray.width(),
        height = gray.height(),
        "derived blurred, mask and edge variants"
    );
    PreprocessedImage {
        width: gray.width(),
        height: gray.height(),
        blurred,
        mask,
        edges,
    }
}

/// Adaptive Gaussian threshold, inverted: dark-on-light ink becomes foreground.
///
/// The local mean is a Gaussian-weighted neighborhood average computed in
/// `f32` to avoid rounding the comparison.
pub fn adaptive_threshold_inv(gray: &GrayImage, sigma: f32, offset: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let f = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(w, h, |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32])
    });
    let local_mean = imageproc::filter::gaussian_blur_f32(&f, sigma);
    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y)[0] as f32;
        let t = local_mean.get_pixel(x, y)[0] - offset;
        if v > t {
            Luma([0])
        } else {
            Luma([FOREGROUND])
        }
    })
}

/// Morphological close (fills small gaps) followed by open (removes speckle).
pub fn close_then_open(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let closed = imageproc::morphology::close(mask, Norm::LInf, radius);
    imageproc::morphology::open(&closed, Norm::LInf, radius)
}

/// Fraction of non-zero pixels in a binary image.
pub fn foreground_fraction(binary: &GrayImage) -> f64 {
    let total = binary.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let on = binary.as_raw().iter().filter(|&&v| v > 0).count();
    on as f64 / total as f64
}
