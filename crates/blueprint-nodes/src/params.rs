//! Detector parameters and their estimation from image statistics.

use crate::error::DetectError;
use crate::stats::ImageStatistics;

/// Smallest radius the estimator proposes (px).
pub const RADIUS_FLOOR: f32 = 3.0;
/// Largest radius the estimator proposes (px).
pub const RADIUS_CEIL: f32 = 100.0;
/// Smallest center separation the estimator proposes (px).
pub const MIN_DISTANCE_FLOOR: f32 = 15.0;
/// Conventional sensitivity range exposed to interactive tuning.
pub const SENSITIVITY_RANGE: std::ops::RangeInclusive<f32> = 10.0..=50.0;

const FALLBACK_MIN_RADIUS: f32 = 5.0;
const FALLBACK_MAX_RADIUS: f32 = 50.0;
const STD_SPREAD: f64 = 1.5;
const MIN_RADIUS_SPAN: f32 = 10.0;

/// Immutable detector parameter set.
///
/// Invariants: every field is finite and positive, and
/// `min_radius < max_radius`. A new estimate or manual edit produces a new
/// value; there are no setters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawParameters")]
pub struct DetectionParameters {
    min_distance: f32,
    min_radius: f32,
    max_radius: f32,
    sensitivity: f32,
}

#[derive(serde::Deserialize)]
struct RawParameters {
    min_distance: f32,
    min_radius: f32,
    max_radius: f32,
    sensitivity: f32,
}

impl TryFrom<RawParameters> for DetectionParameters {
    type Error = DetectError;

    fn try_from(raw: RawParameters) -> Result<Self, Self::Error> {
        Self::new(raw.min_distance, raw.min_radius, raw.max_radius, raw.sensitivity)
    }
}

impl DetectionParameters {
    /// Validate and construct.
    pub fn new(
        min_distance: f32,
        min_radius: f32,
        max_radius: f32,
        sensitivity: f32,
    ) -> Result<Self, DetectError> {
        for (name, v) in [
            ("min_distance", min_distance),
            ("min_radius", min_radius),
            ("max_radius", max_radius),
            ("sensitivity", sensitivity),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(DetectError::invalid_parameters(format!(
                    "{} must be finite and positive, got {}",
                    name, v
                )));
            }
        }
        if min_radius >= max_radius {
            return Err(DetectError::invalid_parameters(format!(
                "min_radius {} must be below max_radius {}",
                min_radius, max_radius
            )));
        }
        Ok(Self {
            min_distance,
            min_radius,
            max_radius,
            sensitivity,
        })
    }

    /// Minimum allowed distance between reported centers (px).
    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    /// Smallest radius searched (px).
    pub fn min_radius(&self) -> f32 {
        self.min_radius
    }

    /// Largest radius searched (px).
    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    /// Accumulator vote threshold; larger is stricter.
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }
}

impl Default for DetectionParameters {
    /// Starting point for manual tuning before any estimate exists.
    fn default() -> Self {
        Self {
            min_distance: 25.0,
            min_radius: 5.0,
            max_radius: 50.0,
            sensitivity: 20.0,
        }
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

fn clamp_radius(r: f64) -> f32 {
    (r.round() as f32).clamp(RADIUS_FLOOR, RADIUS_CEIL)
}

/// Radius search window `[min, max]` from the candidate radius population.
pub fn estimate_radius_range(candidate_radii: &[f64]) -> (f32, f32) {
    let finite: Vec<f64> = candidate_radii
        .iter()
        .copied()
        .filter(|r| r.is_finite())
        .collect();
    if finite.is_empty() {
        return (FALLBACK_MIN_RADIUS, FALLBACK_MAX_RADIUS);
    }
    let mut sorted = finite;
    sorted.sort_by(f64::total_cmp);
    let med = median(&sorted);
    let std = population_std(&sorted);

    let mut min_r = clamp_radius(med - STD_SPREAD * std);
    let mut max_r = clamp_radius(med + STD_SPREAD * std);
    if max_r - min_r < MIN_RADIUS_SPAN {
        min_r = clamp_radius(0.5 * med);
        max_r = clamp_radius(1.5 * med);
    }
    if min_r >= max_r {
        // Only reachable when the population sits at the radius ceiling.
        min_r = clamp_radius(0.5 * max_r as f64);
    }
    (min_r, max_r)
}

/// Accumulator strictness from edge density: busier drawings need more votes.
pub fn sensitivity_for_edge_density(edge_density: f64) -> f32 {
    if edge_density > 0.15 {
        25.0
    } else if edge_density > 0.10 {
        20.0
    } else {
        15.0
    }
}

/// Propose detector parameters from pre-analysis statistics.
pub fn estimate(stats: &ImageStatistics) -> DetectionParameters {
    let (min_radius, max_radius) = estimate_radius_range(&stats.candidate_radii);
    let avg_radius = 0.5 * (min_radius + max_radius);
    let min_distance = (avg_radius * 2.0).round().max(MIN_DISTANCE_FLOOR);
    let sensitivity = sensitivity_for_edge_density(stats.edge_density);
    tracing::debug!(
        min_distance,
        min_radius,
        max_radius,
        sensitivity,
        "estimated detection parameters"
    );
    DetectionParameters {
        min_distance,
        min_radius,
        max_radius,
        sensitivity,
    }
}
