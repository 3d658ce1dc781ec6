//! blueprint-nodes: circular marker detection and node occupancy state for
//! blueprint images.
//!
//! The pipeline stages are:
//!
//! 1. **Preprocess** – grayscale, Gaussian blur, adaptive threshold with
//!    morphological cleanup, Canny edge map.
//! 2. **Analyze** – edge density and radii of circular foreground regions.
//! 3. **Estimate** – derive detection parameters from the statistics.
//! 4. **Detect** – two Hough-gradient passes (blurred grayscale, binary mask).
//! 5. **Merge** – order-preserving proximity deduplication across passes.
//! 6. **Registry** – id-addressed nodes with a free/occupied flag, exported as
//!    a JSON configuration document.
//!
//! # Public API
//! - [`BlueprintSession`] as the primary entry point
//! - [`DetectionParameters`] for manual detection, [`DetectConfig`] for
//!   advanced tuning
//! - [`NodeRegistry`] and [`ConfigurationDocument`] for node state
//!
//! The stage functions are public for callers that drive the pipeline
//! themselves.

mod config;
mod detect;
mod document;
mod error;
mod merge;
mod params;
mod preprocess;
mod raster;
mod registry;
mod session;
mod stats;

#[cfg(test)]
mod test_utils;

pub use config::{AnalysisConfig, DetectConfig, HoughConfig, PreprocessConfig};
pub use detect::{detect, detect_pass, Circle};
pub use document::{BlueprintInfo, ConfigurationDocument};
pub use error::DetectError;
pub use merge::merge;
pub use params::{
    estimate, estimate_radius_range, sensitivity_for_edge_density, DetectionParameters,
    MIN_DISTANCE_FLOOR, RADIUS_CEIL, RADIUS_FLOOR, SENSITIVITY_RANGE,
};
pub use preprocess::{preprocess, PreprocessedImage};
pub use raster::{load_image, to_gray};
pub use registry::{Node, NodeRegistry, NodeStatus, NodeSummary};
pub use session::{run_detection, BlueprintSession, DetectionRun};
pub use stats::{analyze, ImageStatistics};
