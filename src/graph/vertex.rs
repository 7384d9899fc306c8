//! Vertex implementation for the learning graph
//!
//! A vertex has exactly one label and is identified within that label by its
//! natural key, which is also mirrored as an ordinary attribute
//! (`userId`, `name`, `activityId`).

use super::property::{PropertyMap, PropertyValue};
use super::types::{now_millis, NaturalKey, NodeId, VertexLabel};
use serde::{Deserialize, Serialize};

/// A labelled vertex with attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Store-assigned identifier
    pub id: NodeId,

    pub label: VertexLabel,

    /// Natural key, unique within `label`
    pub key: NaturalKey,

    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Vertex {
    pub fn new(id: NodeId, label: VertexLabel, key: NaturalKey, properties: PropertyMap) -> Self {
        let now = now_millis();
        let mut vertex = Vertex {
            id,
            label,
            key,
            properties,
            created_at: now,
            updated_at: now,
        };
        vertex.mirror_key();
        vertex
    }

    /// The key attribute always reflects the natural key, whatever callers pass.
    fn mirror_key(&mut self) {
        self.properties.insert(
            self.label.key_property().to_string(),
            PropertyValue::String(self.key.as_str().to_string()),
        );
    }

    /// Merge attributes: new keys are added, existing keys overwritten.
    pub fn merge_properties(&mut self, properties: PropertyMap) {
        if properties.is_empty() {
            return;
        }
        self.properties.extend(properties);
        self.mirror_key();
        self.updated_at = now_millis();
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
        self.mirror_key();
        self.updated_at = now_millis();
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// String attribute shortcut
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_string)
    }

    /// Numeric attribute shortcut
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(PropertyValue::as_number)
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vertex {}
