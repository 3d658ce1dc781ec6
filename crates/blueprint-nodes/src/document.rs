//! Exported configuration document.
//!
//! ```json
//! {
//!   "blueprint_info": { "width": 800, "height": 600 },
//!   "nodes": [ { "id": 1, "x": 120, "y": 88, "radius": 14, "status": "free" } ]
//! }
//! ```

use crate::registry::{Node, NodeStatus};

/// Source image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlueprintInfo {
    /// Image width (px).
    pub width: u32,
    /// Image height (px).
    pub height: u32,
}

/// Serializable snapshot of one registry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigurationDocument {
    /// Dimensions of the blueprint the nodes were detected on.
    pub blueprint_info: BlueprintInfo,
    /// Nodes in id order.
    pub nodes: Vec<Node>,
}

impl ConfigurationDocument {
    /// Pretty-printed JSON, two-space indented.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a previously exported document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Number of nodes currently marked occupied.
    pub fn occupied_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Occupied)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ConfigurationDocument {
        ConfigurationDocument {
            blueprint_info: BlueprintInfo {
                width: 640,
                height: 480,
            },
            nodes: vec![
                Node {
                    id: 1,
                    x: 10,
                    y: 20,
                    radius: 8,
                    status: NodeStatus::Free,
                },
                Node {
                    id: 2,
                    x: 90,
                    y: 40,
                    radius: 9,
                    status: NodeStatus::Occupied,
                },
            ],
        }
    }

    #[test]
    fn json_layout_matches_schema() {
        let value: serde_json::Value =
            serde_json::from_str(&doc().to_json_pretty().expect("serialize")).expect("json");
        assert_eq!(value["blueprint_info"]["width"], 640);
        assert_eq!(value["blueprint_info"]["height"], 480);
        assert_eq!(value["nodes"][0]["id"], 1);
        assert_eq!(value["nodes"][0]["x"], 10);
        assert_eq!(value["nodes"][0]["radius"], 8);
        assert_eq!(value["nodes"][0]["status"], "free");
        assert_eq!(value["nodes"][1]["status"], "occupied");
    }

    #[test]
    fn parses_exported_text() {
        let text = doc().to_json_pretty().expect("serialize");
        let parsed = ConfigurationDocument::from_json(&text).expect("parse");
        assert_eq!(parsed.occupied_count(), 1);
        assert_eq!(parsed.nodes[1].x, 90);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let text = r#"{"blueprint_info":{"width":1,"height":1},
            "nodes":[{"id":1,"x":0,"y":0,"radius":3,"status":"reserved"}]}"#;
        assert!(ConfigurationDocument::from_json(text).is_err());
    }
}
