//! Node records and their occupancy state.
//!
//! A registry starts `Empty`. Every [`NodeRegistry::build`] replaces the
//! whole node set and leaves it `Populated`, even when no circle was found;
//! [`NodeRegistry::toggle`] is the only in-place mutation. Ids are reassigned
//! on every build, so occupancy edits do not survive re-detection.

use crate::detect::Circle;
use crate::document::{BlueprintInfo, ConfigurationDocument};
use crate::error::DetectError;

/// Occupancy flag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Available.
    #[default]
    Free,
    /// Taken.
    Occupied,
}

impl NodeStatus {
    /// The other state.
    pub fn flipped(self) -> Self {
        match self {
            Self::Free => Self::Occupied,
            Self::Occupied => Self::Free,
        }
    }
}

/// One detected marker with its occupancy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// 1-based id in detection order.
    pub id: u32,
    /// Center x (px, rounded).
    pub x: u32,
    /// Center y (px, rounded).
    pub y: u32,
    /// Radius (px, rounded).
    pub radius: u32,
    /// Occupancy.
    pub status: NodeStatus,
}

impl Node {
    fn from_circle(index: usize, circle: &Circle) -> Self {
        Self {
            id: index as u32 + 1,
            x: round_px(circle.center_x),
            y: round_px(circle.center_y),
            radius: round_px(circle.radius),
            status: NodeStatus::Free,
        }
    }
}

fn round_px(v: f32) -> u32 {
    if v.is_finite() {
        v.round().max(0.0) as u32
    } else {
        0
    }
}

/// Node counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct NodeSummary {
    /// All nodes.
    pub total: usize,
    /// Nodes marked free.
    pub free: usize,
    /// Nodes marked occupied.
    pub occupied: usize,
}

/// Ordered node set of one image.
///
/// Mutation requires `&mut self`; share a registry across threads only
/// behind a single owner.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Option<Vec<Node>>,
}

impl NodeRegistry {
    /// Empty registry: no detection run yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a detection run has been committed.
    pub fn is_populated(&self) -> bool {
        self.nodes.is_some()
    }

    /// Replace the node set with one free node per circle, ids `1..=n` in
    /// input order.
    pub fn build(&mut self, circles: &[Circle]) -> &[Node] {
        let nodes: Vec<Node> = circles
            .iter()
            .enumerate()
            .map(|(i, c)| Node::from_circle(i, c))
            .collect();
        tracing::info!(nodes = nodes.len(), "node set rebuilt");
        self.nodes.insert(nodes)
    }

    /// Current nodes; empty before the first build.
    pub fn nodes(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or(&[])
    }

    /// Look up a node by id.
    pub fn node(&self, id: u32) -> Option<&Node> {
        self.nodes().iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: u32) -> Result<&mut Node, DetectError> {
        self.nodes
            .as_mut()
            .and_then(|nodes| nodes.iter_mut().find(|n| n.id == id))
            .ok_or(DetectError::NotFound { id })
    }

    /// Flip free <-> occupied and return the updated node.
    pub fn toggle(&mut self, id: u32) -> Result<Node, DetectError> {
        let node = self.node_mut(id)?;
        node.status = node.status.flipped();
        tracing::debug!(id, status = ?node.status, "node toggled");
        Ok(*node)
    }

    /// Set a node's status explicitly; toggles only when it differs.
    pub fn set_status(&mut self, id: u32, status: NodeStatus) -> Result<Node, DetectError> {
        let current = self.node_mut(id)?.status;
        if current == status {
            return Ok(*self.node_mut(id)?);
        }
        self.toggle(id)
    }

    /// Counts by status.
    pub fn summary(&self) -> Result<NodeSummary, DetectError> {
        let nodes = self.nodes.as_ref().ok_or(DetectError::EmptyState)?;
        let occupied = nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Occupied)
            .count();
        Ok(NodeSummary {
            total: nodes.len(),
            free: nodes.len() - occupied,
            occupied,
        })
    }

    /// Snapshot the current state as a configuration document.
    pub fn export(&self, width: u32, height: u32) -> Result<ConfigurationDocument, DetectError> {
        let nodes = self.nodes.as_ref().ok_or(DetectError::EmptyState)?;
        Ok(ConfigurationDocument {
            blueprint_info: BlueprintInfo { width, height },
            nodes: nodes.clone(),
        })
    }
}
