//! Learngraph
//!
//! An in-memory learning graph: users, concepts, activities and domains as
//! vertices, with the relationships between them as labelled edges. On top
//! of the store sit mastery tracking, learning-path discovery, concept
//! importance, learner communities, study-loop detection and a read-only
//! traversal query gateway.
//!
//! # Layout
//!
//! - `graph`: vertex/edge model, the arena-backed [`GraphStore`], per-key
//!   locks and the shared [`GraphHandle`]
//! - `mastery`: exponential mastery updates and activity tracking
//! - `ontology`: user profiles, concept relationships, domain ontologies
//! - `algo`: learning paths, PageRank importance, communities, cycles and
//!   per-learner read models, backed by `learngraph-algorithms`
//! - `query`: deny-list screening and the `g.V()...` traversal language
//! - `persistence`: gzip + bincode snapshots
//! - `engine`: the [`LearningGraph`] facade exposing every operation
//!
//! ## Example Usage
//!
//! ```rust
//! use learngraph::graph::{EdgeLabel, GraphStore, PropertyMap, VertexLabel};
//!
//! let mut store = GraphStore::new();
//!
//! // Natural keys make vertex creation idempotent
//! let alice = store.upsert_vertex(VertexLabel::User, "alice", PropertyMap::new()).unwrap();
//! let again = store.upsert_vertex(VertexLabel::User, "alice", PropertyMap::new()).unwrap();
//! assert!(alice.created);
//! assert_eq!(alice.id, again.id);
//!
//! let algebra = store.upsert_vertex(VertexLabel::Concept, "algebra", PropertyMap::new()).unwrap().id;
//! store.upsert_edge(EdgeLabel::Studies, alice.id, algebra, PropertyMap::new()).unwrap();
//!
//! // STUDIES is a singleton label: one edge per (user, concept)
//! store.upsert_edge(EdgeLabel::Studies, alice.id, algebra, PropertyMap::new()).unwrap();
//! assert_eq!(store.edge_count(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod mastery;
pub mod ontology;
pub mod persistence;
pub mod query;

// Re-export main types for convenience
pub use graph::{
    Edge, EdgeId, EdgeLabel, GraphError, GraphHandle, GraphResult, GraphStore, NodeId, PropertyMap,
    PropertyValue, Vertex, VertexLabel,
};

pub use config::{ConfigError, EngineConfig};
pub use engine::LearningGraph;
pub use error::{EngineError, EngineResult};

pub use mastery::{ActivityRecord, MasteryTracker, MasteryUpdate};

pub use query::{parse_query, QueryGateway, QueryResult};

pub use persistence::{SnapshotError, SnapshotResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
