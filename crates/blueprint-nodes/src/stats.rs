//! Image pre-analysis: edge density and circular-region radius candidates.
//!
//! Edge density drives the accumulator strictness; the radii of roughly
//! circular foreground blobs drive the radius search window. Both are pure
//! functions of the preprocessed variants.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

use crate::config::{AnalysisConfig, DetectConfig};
use crate::error::DetectError;
use crate::preprocess::{foreground_fraction, preprocess, PreprocessedImage};
use crate::raster::validate_dimensions;

/// Scalar features derived from one image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageStatistics {
    /// Fraction of edge pixels over all pixels, in `[0, 1]`.
    pub edge_density: f64,
    /// Equivalent radius `sqrt(area / pi)` of every accepted circular region,
    /// in contour discovery order.
    pub candidate_radii: Vec<f64>,
    /// Outer regions large enough to be scored for circularity.
    pub regions_examined: usize,
}

/// Area and closed perimeter of a traced region boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionShape {
    /// Shoelace area of the boundary polygon (px²).
    pub area: f64,
    /// Closed arc length of the boundary polygon (px).
    pub perimeter: f64,
}

impl RegionShape {
    /// Measure a closed boundary polygon.
    pub fn from_boundary(points: &[Point<i32>]) -> Self {
        let n = points.len();
        if n < 2 {
            return Self {
                area: 0.0,
                perimeter: 0.0,
            };
        }
        let mut twice_area = 0.0f64;
        let mut perimeter = 0.0f64;
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            twice_area += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
            let dx = (b.x - a.x) as f64;
            let dy = (b.y - a.y) as f64;
            perimeter += (dx * dx + dy * dy).sqrt();
        }
        Self {
            area: twice_area.abs() * 0.5,
            perimeter,
        }
    }

    /// `4*pi*area / perimeter²`; 1.0 for a perfect circle, 0 when degenerate.
    pub fn circularity(&self) -> f64 {
        if self.perimeter <= 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area / (self.perimeter * self.perimeter)
    }

    /// Radius of the disk with the same area.
    pub fn equivalent_radius(&self) -> f64 {
        (self.area / std::f64::consts::PI).sqrt()
    }
}

/// Analyze a grayscale image end to end.
pub fn analyze(gray: &GrayImage, config: &DetectConfig) -> Result<ImageStatistics, DetectError> {
    validate_dimensions(gray.width(), gray.height())?;
    config.validate()?;
    let pre = preprocess(gray, &config.preprocess);
    Ok(analyze_preprocessed(&pre, &config.analysis))
}

/// Analyze already-derived variants.
pub fn analyze_preprocessed(pre: &PreprocessedImage, config: &AnalysisConfig) -> ImageStatistics {
    let edge_density = foreground_fraction(&pre.edges);
    let (candidate_radii, regions_examined) = circular_region_radii(&pre.mask, config);
    tracing::debug!(
        edge_density,
        regions_examined,
        circular = candidate_radii.len(),
        "pre-analysis complete"
    );
    ImageStatistics {
        edge_density,
        candidate_radii,
        regions_examined,
    }
}

/// Equivalent radii of outermost mask regions passing the area and
/// circularity screens, plus the count of regions above the area floor.
pub fn circular_region_radii(mask: &GrayImage, config: &AnalysisConfig) -> (Vec<f64>, usize) {
    let mut radii = Vec::new();
    let mut examined = 0usize;
    for contour in find_contours::<i32>(mask) {
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let shape = RegionShape::from_boundary(&contour.points);
        if shape.area <= config.min_region_area || shape.perimeter <= 0.0 {
            continue;
        }
        examined += 1;
        if shape.circularity() > config.min_circularity {
            radii.push(shape.equivalent_radius());
        }
    }
    (radii, examined)
}
