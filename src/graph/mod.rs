//! Learning graph data model and storage
//!
//! - Labelled vertices identified by `(label, natural key)`
//! - Directed, labelled edges; singleton labels deduplicated per pair
//! - Find-or-create mutation API
//! - Per-key locking and a lifecycle-managed shared handle

pub mod edge;
pub mod handle;
pub mod locks;
pub mod property;
pub mod store;
pub mod types;
pub mod vertex;

pub use edge::Edge;
pub use handle::GraphHandle;
pub use locks::{KeyGuard, KeyLocks, LockKey};
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{now_millis, EdgeId, EdgeLabel, NaturalKey, NodeId, Upsert, VertexLabel};
pub use vertex::Vertex;
