//! Core type definitions for the learning graph

use super::store::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest accepted natural key, in bytes
pub const MAX_NATURAL_KEY_LEN: usize = 256;

/// Current wall-clock time as Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Unique identifier for a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn new(id: u64) -> Self {
        EdgeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        EdgeId(id)
    }
}

/// Vertex label. Each label has its own natural-key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum VertexLabel {
    User,
    Concept,
    Activity,
    Domain,
}

impl VertexLabel {
    pub const ALL: [VertexLabel; 4] = [
        VertexLabel::User,
        VertexLabel::Concept,
        VertexLabel::Activity,
        VertexLabel::Domain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VertexLabel::User => "User",
            VertexLabel::Concept => "Concept",
            VertexLabel::Activity => "Activity",
            VertexLabel::Domain => "Domain",
        }
    }

    /// Attribute under which the natural key is mirrored on the vertex
    pub fn key_property(&self) -> &'static str {
        match self {
            VertexLabel::User => "userId",
            VertexLabel::Concept => "name",
            VertexLabel::Activity => "activityId",
            VertexLabel::Domain => "name",
        }
    }
}

impl fmt::Display for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VertexLabel {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VertexLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| GraphError::InvalidLabel(s.to_string()))
    }
}

/// Edge label (relationship type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum EdgeLabel {
    #[serde(rename = "PERFORMED")]
    Performed,
    #[serde(rename = "RELATED_TO")]
    RelatedTo,
    #[serde(rename = "STUDIES")]
    Studies,
    #[serde(rename = "MASTERED")]
    Mastered,
    #[serde(rename = "PREREQUISITE_OF")]
    PrerequisiteOf,
    #[serde(rename = "BELONGS_TO")]
    BelongsTo,
}

impl EdgeLabel {
    pub const ALL: [EdgeLabel; 6] = [
        EdgeLabel::Performed,
        EdgeLabel::RelatedTo,
        EdgeLabel::Studies,
        EdgeLabel::Mastered,
        EdgeLabel::PrerequisiteOf,
        EdgeLabel::BelongsTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::Performed => "PERFORMED",
            EdgeLabel::RelatedTo => "RELATED_TO",
            EdgeLabel::Studies => "STUDIES",
            EdgeLabel::Mastered => "MASTERED",
            EdgeLabel::PrerequisiteOf => "PREREQUISITE_OF",
            EdgeLabel::BelongsTo => "BELONGS_TO",
        }
    }

    /// At most one edge of this label exists per (source, target) pair.
    /// The other labels are append-only, one edge per occurrence.
    pub fn is_singleton(&self) -> bool {
        !matches!(self, EdgeLabel::Performed | EdgeLabel::RelatedTo)
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeLabel {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| GraphError::InvalidLabel(s.to_string()))
    }
}

/// Validated domain identifier (userId, concept name, activity id, domain name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NaturalKey(String);

impl NaturalKey {
    /// Reject empty, oversized, or control-character keys.
    pub fn new(raw: impl Into<String>) -> Result<Self, GraphError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(GraphError::InvalidNaturalKey("key is empty".to_string()));
        }
        if raw.len() > MAX_NATURAL_KEY_LEN {
            return Err(GraphError::InvalidNaturalKey(format!(
                "key exceeds {} bytes",
                MAX_NATURAL_KEY_LEN
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(GraphError::InvalidNaturalKey(format!(
                "key {:?} contains control characters",
                raw
            )));
        }
        Ok(NaturalKey(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a find-or-create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert<T> {
    pub id: T,
    /// True when this call inserted the element
    pub created: bool,
}
