//! Edge implementation for the learning graph
//!
//! Edges are directed and carry one label. Whether several edges of the same
//! label may connect the same pair is decided by [`EdgeLabel::is_singleton`].

use super::property::{PropertyMap, PropertyValue};
use super::types::{now_millis, EdgeId, EdgeLabel, NodeId};
use serde::{Deserialize, Serialize};

/// A directed, labelled edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    pub label: EdgeLabel,

    /// Source vertex (edge goes FROM this vertex)
    pub source: NodeId,

    /// Target vertex (edge goes TO this vertex)
    pub target: NodeId,

    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Edge {
    pub fn new(id: EdgeId, label: EdgeLabel, source: NodeId, target: NodeId, properties: PropertyMap) -> Self {
        let now = now_millis();
        Edge {
            id,
            label,
            source,
            target,
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge attributes: new keys are added, existing keys overwritten.
    pub fn merge_properties(&mut self, properties: PropertyMap) {
        if properties.is_empty() {
            return;
        }
        self.properties.extend(properties);
        self.updated_at = now_millis();
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Numeric attribute shortcut
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(PropertyValue::as_number)
    }

    /// Check if this edge goes FROM a specific vertex
    pub fn starts_from(&self, node: NodeId) -> bool {
        self.source == node
    }

    /// Check if this edge goes TO a specific vertex
    pub fn ends_at(&self, node: NodeId) -> bool {
        self.target == node
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}
