//! Engine instance for one loaded blueprint.
//!
//! [`BlueprintSession`] owns the derived image variants and the only
//! [`NodeRegistry`] for that image. Detection itself is computed through
//! `&self` ([`BlueprintSession::run_auto`], [`BlueprintSession::run_manual`])
//! and has no visible effect until [`BlueprintSession::commit`] installs the
//! result. An interactive host can therefore compute runs on a worker
//! thread and simply drop results it no longer wants.
//!
//! # Examples
//!
//! ```no_run
//! use blueprint_nodes::BlueprintSession;
//!
//! let image = image::open("blueprint.png").unwrap();
//! let mut session = BlueprintSession::new(&image).unwrap();
//! let n = session.auto_detect().len();
//! session.toggle(1).ok();
//! let doc = session.export().unwrap();
//! println!("{} markers, {} occupied", n, doc.occupied_count());
//! ```

use image::{DynamicImage, GrayImage};

use crate::config::DetectConfig;
use crate::detect::{detect, Circle};
use crate::document::ConfigurationDocument;
use crate::error::DetectError;
use crate::merge::merge;
use crate::params::{estimate, DetectionParameters};
use crate::preprocess::{preprocess, PreprocessedImage};
use crate::raster::{to_gray, validate_dimensions};
use crate::registry::{Node, NodeRegistry, NodeStatus, NodeSummary};
use crate::stats::{analyze_preprocessed, ImageStatistics};

/// Uncommitted result of one detection run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionRun {
    /// Parameters the run used.
    pub params: DetectionParameters,
    /// Pre-analysis statistics, present for estimated runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ImageStatistics>,
    /// Concatenated output of both accumulator passes.
    pub raw_circles: Vec<Circle>,
    /// Deduplicated circles, in node order.
    pub circles: Vec<Circle>,
}

/// Run both passes and the merger over already-derived variants.
pub fn run_detection(
    pre: &PreprocessedImage,
    params: &DetectionParameters,
    config: &DetectConfig,
) -> DetectionRun {
    let raw_circles = detect(pre, params, &config.hough);
    let circles = merge(&raw_circles, params.min_distance());
    DetectionRun {
        params: *params,
        statistics: None,
        raw_circles,
        circles,
    }
}

/// Detection engine bound to one image.
#[derive(Debug, Clone)]
pub struct BlueprintSession {
    config: DetectConfig,
    pre: PreprocessedImage,
    registry: NodeRegistry,
    last_params: Option<DetectionParameters>,
}

impl BlueprintSession {
    /// Load an image with the default configuration.
    pub fn new(image: &DynamicImage) -> Result<Self, DetectError> {
        Self::with_config(image, DetectConfig::default())
    }

    /// Load an image with a custom configuration.
    pub fn with_config(image: &DynamicImage, config: DetectConfig) -> Result<Self, DetectError> {
        let gray = to_gray(image)?;
        Self::from_gray(&gray, config)
    }

    /// Load an already-grayscale image.
    pub fn from_gray(gray: &GrayImage, config: DetectConfig) -> Result<Self, DetectError> {
        validate_dimensions(gray.width(), gray.height())?;
        config.validate()?;
        let pre = preprocess(gray, &config.preprocess);
        Ok(Self {
            config,
            pre,
            registry: NodeRegistry::new(),
            last_params: None,
        })
    }

    /// Image dimensions `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pre.dimensions()
    }

    /// Active configuration.
    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Derived image variants.
    pub fn preprocessed(&self) -> &PreprocessedImage {
        &self.pre
    }

    /// Node state.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Parameters of the last committed run.
    pub fn last_parameters(&self) -> Option<&DetectionParameters> {
        self.last_params.as_ref()
    }

    /// Pre-analysis statistics of the loaded image.
    pub fn analyze(&self) -> ImageStatistics {
        analyze_preprocessed(&self.pre, &self.config.analysis)
    }

    /// Estimate parameters without detecting.
    pub fn estimate_parameters(&self) -> DetectionParameters {
        estimate(&self.analyze())
    }

    /// Compute a run with estimated parameters; nothing is committed.
    pub fn run_auto(&self) -> DetectionRun {
        let statistics = self.analyze();
        let params = estimate(&statistics);
        let mut run = run_detection(&self.pre, &params, &self.config);
        run.statistics = Some(statistics);
        run
    }

    /// Compute a run with caller-supplied parameters; nothing is committed.
    pub fn run_manual(&self, params: &DetectionParameters) -> DetectionRun {
        run_detection(&self.pre, params, &self.config)
    }

    /// Install a run as the current node set, discarding prior occupancy.
    ///
    /// Circles are merged again with the run's `min_distance`, so a run
    /// assembled by hand still yields well-separated nodes.
    pub fn commit(&mut self, run: DetectionRun) -> &[Node] {
        let p = run.params;
        let circles = merge(&run.circles, p.min_distance());
        if circles.is_empty() {
            tracing::warn!(
                min_distance = p.min_distance(),
                min_radius = p.min_radius(),
                max_radius = p.max_radius(),
                sensitivity = p.sensitivity(),
                "no markers detected; try adjusting the parameters manually"
            );
        } else {
            tracing::info!(
                markers = circles.len(),
                raw = run.raw_circles.len(),
                min_distance = p.min_distance(),
                min_radius = p.min_radius(),
                max_radius = p.max_radius(),
                sensitivity = p.sensitivity(),
                "detection committed"
            );
        }
        self.last_params = Some(p);
        self.registry.build(&circles)
    }

    /// Estimate parameters, detect, and commit.
    pub fn auto_detect(&mut self) -> &[Node] {
        let run = self.run_auto();
        self.commit(run)
    }

    /// Detect with caller-supplied parameters and commit.
    pub fn detect_with(&mut self, params: &DetectionParameters) -> &[Node] {
        let run = self.run_manual(params);
        self.commit(run)
    }

    /// Flip a node's occupancy.
    pub fn toggle(&mut self, id: u32) -> Result<Node, DetectError> {
        self.registry.toggle(id)
    }

    /// Set a node's status explicitly.
    pub fn set_status(&mut self, id: u32, status: NodeStatus) -> Result<Node, DetectError> {
        self.registry.set_status(id, status)
    }

    /// Counts by status.
    pub fn summary(&self) -> Result<NodeSummary, DetectError> {
        self.registry.summary()
    }

    /// Configuration document for the loaded image.
    pub fn export(&self) -> Result<ConfigurationDocument, DetectError> {
        let (w, h) = self.dimensions();
        self.registry.export(w, h)
    }
}
