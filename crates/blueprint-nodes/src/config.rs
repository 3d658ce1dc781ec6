//! Tuning surface for preprocessing, pre-analysis and the circle accumulator.
//!
//! Defaults reproduce the fixed constants of the marker workflow; most callers
//! never touch this and only vary [`DetectionParameters`](crate::DetectionParameters).

use std::path::Path;

use crate::detect::ARC_SECTORS;
use crate::error::DetectError;

/// Working-copy derivation settings shared by analysis and detection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gaussian sigma of the blurred grayscale variant (9x9 kernel equivalent).
    pub blur_sigma: f32,
    /// Gaussian sigma of the local mean used by adaptive thresholding
    /// (an 11 px block).
    pub threshold_sigma: f32,
    /// Offset subtracted from the local mean; a pixel is foreground when
    /// `gray <= local_mean - threshold_offset`.
    pub threshold_offset: f32,
    /// Structuring element radius (L-infinity) for close/open cleanup.
    pub morph_radius: u8,
    /// Canny low threshold for the edge-density map.
    pub edge_low: f32,
    /// Canny high threshold for the edge-density map.
    pub edge_high: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            threshold_sigma: 2.0,
            threshold_offset: 2.0,
            morph_radius: 1,
            edge_low: 50.0,
            edge_high: 150.0,
        }
    }
}

/// Contour screening used to collect candidate marker radii.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Regions with area at or below this (px²) are ignored.
    pub min_region_area: f64,
    /// Regions must score strictly above this circularity.
    pub min_circularity: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_region_area: 50.0,
            min_circularity: 0.5,
        }
    }
}

/// Hough-gradient accumulator settings not covered by `DetectionParameters`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Canny high threshold applied to each pass input (low is half of it).
    pub canny_high: f32,
    /// Gaussian sigma applied before Sobel gradients; `0` uses the raw pass
    /// input. Keeps gradient directions stable on the binary mask pass.
    pub gradient_sigma: f32,
    /// Minimum fraction of the circumference that must be supported by edge
    /// pixels for a circle to be reported.
    pub min_arc_coverage: f32,
    /// Minimum number of the eight angular sectors around a center that
    /// must contain supporting edge pixels.
    pub min_arc_sectors: u32,
    /// Optional cap on circles reported per pass (strongest first).
    #[serde(default)]
    pub max_circles: Option<usize>,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            canny_high: 50.0,
            gradient_sigma: 1.0,
            min_arc_coverage: 0.25,
            min_arc_sectors: 6,
            max_circles: None,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Working-copy derivation.
    pub preprocess: PreprocessConfig,
    /// Pre-analysis contour screening.
    pub analysis: AnalysisConfig,
    /// Circle accumulator.
    pub hough: HoughConfig,
}

impl DetectConfig {
    /// Load overrides from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that would otherwise panic or silently misbehave.
    pub fn validate(&self) -> Result<(), DetectError> {
        let p = &self.preprocess;
        for (name, sigma) in [
            ("blur_sigma", p.blur_sigma),
            ("threshold_sigma", p.threshold_sigma),
        ] {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(DetectError::invalid_parameters(format!(
                    "{} must be positive, got {}",
                    name, sigma
                )));
            }
        }
        if !(p.edge_low.is_finite() && p.edge_high.is_finite() && p.edge_low <= p.edge_high) {
            return Err(DetectError::invalid_parameters(format!(
                "edge thresholds must satisfy low <= high, got {} / {}",
                p.edge_low, p.edge_high
            )));
        }
        if !(self.hough.canny_high.is_finite() && self.hough.canny_high > 0.0) {
            return Err(DetectError::invalid_parameters(format!(
                "canny_high must be positive, got {}",
                self.hough.canny_high
            )));
        }
        if !(self.hough.gradient_sigma.is_finite() && self.hough.gradient_sigma >= 0.0) {
            return Err(DetectError::invalid_parameters(format!(
                "gradient_sigma must be non-negative, got {}",
                self.hough.gradient_sigma
            )));
        }
        if !(0.0..=1.0).contains(&self.hough.min_arc_coverage) {
            return Err(DetectError::invalid_parameters(format!(
                "min_arc_coverage must lie in [0, 1], got {}",
                self.hough.min_arc_coverage
            )));
        }
        if self.hough.min_arc_sectors > ARC_SECTORS {
            return Err(DetectError::invalid_parameters(format!(
                "min_arc_sectors must be at most {}, got {}",
                ARC_SECTORS, self.hough.min_arc_sectors
            )));
        }
        Ok(())
    }
}
