//! In-memory graph storage implementation
//!
//! Vertices and edges live in arenas indexed by id. Natural keys, labels and
//! singleton edges each have a hash index so find-or-create is one lookup.

use super::edge::Edge;
use super::property::PropertyMap;
use super::types::{EdgeId, EdgeLabel, NaturalKey, NodeId, Upsert, VertexLabel};
use super::vertex::Vertex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Unknown label: {0}")]
    InvalidLabel(String),

    #[error("Invalid natural key: {0}")]
    InvalidNaturalKey(String),

    #[error("Corrupt graph data: {0}")]
    Corrupt(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
///
/// - vertices: NodeId -> Vertex (arena, id is the index)
/// - edges: EdgeId -> Edge (arena, id is the index)
/// - outgoing / incoming: NodeId -> Vec<EdgeId> adjacency lists
/// - key_index: (label, natural key) -> NodeId
/// - singleton_index: (label, source, target) -> EdgeId for singleton labels
#[derive(Debug, Default)]
pub struct GraphStore {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    key_index: HashMap<(VertexLabel, NaturalKey), NodeId>,
    label_index: HashMap<VertexLabel, Vec<NodeId>>,
    edge_label_index: HashMap<EdgeLabel, Vec<EdgeId>>,
    singleton_index: HashMap<(EdgeLabel, NodeId, NodeId), EdgeId>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    /// Find-or-create a vertex by natural key, merging `properties` into an
    /// existing vertex.
    pub fn upsert_vertex(
        &mut self,
        label: VertexLabel,
        key: &str,
        properties: PropertyMap,
    ) -> GraphResult<Upsert<NodeId>> {
        let key = NaturalKey::new(key)?;
        if let Some(&id) = self.key_index.get(&(label, key.clone())) {
            self.vertex_mut(id)?.merge_properties(properties);
            return Ok(Upsert { id, created: false });
        }
        Ok(Upsert {
            id: self.insert_vertex(label, key, properties),
            created: true,
        })
    }

    /// Find-or-create a vertex, leaving an existing one untouched.
    ///
    /// `properties` only apply when the vertex is created.
    pub fn get_or_create_vertex(
        &mut self,
        label: VertexLabel,
        key: &str,
        properties: PropertyMap,
    ) -> GraphResult<Upsert<NodeId>> {
        let key = NaturalKey::new(key)?;
        if let Some(&id) = self.key_index.get(&(label, key.clone())) {
            return Ok(Upsert { id, created: false });
        }
        Ok(Upsert {
            id: self.insert_vertex(label, key, properties),
            created: true,
        })
    }

    fn insert_vertex(&mut self, label: VertexLabel, key: NaturalKey, properties: PropertyMap) -> NodeId {
        let id = NodeId::new(self.vertices.len() as u64);
        debug!(%label, key = %key, id = id.as_u64(), "creating vertex");

        self.key_index.insert((label, key.clone()), id);
        self.label_index.entry(label).or_default().push(id);
        self.vertices.push(Vertex::new(id, label, key, properties));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Create or merge an edge.
    ///
    /// Singleton labels resolve to the existing `(label, source, target)`
    /// edge when there is one; append-only labels always get a new edge.
    pub fn upsert_edge(
        &mut self,
        label: EdgeLabel,
        source: NodeId,
        target: NodeId,
        properties: PropertyMap,
    ) -> GraphResult<Upsert<EdgeId>> {
        if label.is_singleton() {
            return self.find_or_create_edge(label, source, target, properties);
        }
        self.check_endpoints(source, target)?;
        Ok(Upsert {
            id: self.insert_edge(label, source, target, properties),
            created: true,
        })
    }

    /// Find-or-create regardless of label, merging into an existing edge.
    pub fn find_or_create_edge(
        &mut self,
        label: EdgeLabel,
        source: NodeId,
        target: NodeId,
        properties: PropertyMap,
    ) -> GraphResult<Upsert<EdgeId>> {
        self.check_endpoints(source, target)?;
        if let Some(id) = self.find_edge(label, source, target) {
            self.edge_mut(id)?.merge_properties(properties);
            return Ok(Upsert { id, created: false });
        }
        Ok(Upsert {
            id: self.insert_edge(label, source, target, properties),
            created: true,
        })
    }

    fn check_endpoints(&self, source: NodeId, target: NodeId) -> GraphResult<()> {
        if !self.has_vertex(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_vertex(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }
        Ok(())
    }

    fn insert_edge(&mut self, label: EdgeLabel, source: NodeId, target: NodeId, properties: PropertyMap) -> EdgeId {
        let id = EdgeId::new(self.edges.len() as u64);
        debug!(%label, source = source.as_u64(), target = target.as_u64(), id = id.as_u64(), "creating edge");

        if label.is_singleton() {
            self.singleton_index.entry((label, source, target)).or_insert(id);
        }
        self.edge_label_index.entry(label).or_default().push(id);
        self.outgoing[source.as_u64() as usize].push(id);
        self.incoming[target.as_u64() as usize].push(id);
        self.edges.push(Edge::new(id, label, source, target, properties));
        id
    }

    /// Merge attributes into an existing vertex
    pub fn merge_vertex_properties(&mut self, id: NodeId, properties: PropertyMap) -> GraphResult<()> {
        self.vertex_mut(id)?.merge_properties(properties);
        Ok(())
    }

    /// Merge attributes into an existing edge
    pub fn merge_edge_properties(&mut self, id: EdgeId, properties: PropertyMap) -> GraphResult<()> {
        self.edge_mut(id)?.merge_properties(properties);
        Ok(())
    }

    /// Look a vertex up by natural key
    pub fn find_vertex(&self, label: VertexLabel, key: &str) -> Option<NodeId> {
        let key = NaturalKey::new(key).ok()?;
        self.key_index.get(&(label, key)).copied()
    }

    /// First `(label, source, target)` edge, if any
    pub fn find_edge(&self, label: EdgeLabel, source: NodeId, target: NodeId) -> Option<EdgeId> {
        if label.is_singleton() {
            return self.singleton_index.get(&(label, source, target)).copied();
        }
        self.outgoing
            .get(source.as_u64() as usize)?
            .iter()
            .copied()
            .find(|&eid| {
                let edge = &self.edges[eid.as_u64() as usize];
                edge.label == label && edge.target == target
            })
    }

    pub fn has_vertex(&self, id: NodeId) -> bool {
        (id.as_u64() as usize) < self.vertices.len()
    }

    /// Get a vertex by id
    pub fn get_vertex(&self, id: NodeId) -> Option<&Vertex> {
        self.vertices.get(id.as_u64() as usize)
    }

    /// Get an edge by id
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.as_u64() as usize)
    }

    fn vertex_mut(&mut self, id: NodeId) -> GraphResult<&mut Vertex> {
        self.vertices
            .get_mut(id.as_u64() as usize)
            .ok_or(GraphError::NodeNotFound(id))
    }

    fn edge_mut(&mut self, id: EdgeId) -> GraphResult<&mut Edge> {
        self.edges
            .get_mut(id.as_u64() as usize)
            .ok_or(GraphError::EdgeNotFound(id))
    }

    /// Outgoing edges of a vertex (empty for unknown ids)
    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing
            .get(id.as_u64() as usize)
            .into_iter()
            .flatten()
            .map(move |eid| &self.edges[eid.as_u64() as usize])
    }

    /// Incoming edges of a vertex (empty for unknown ids)
    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.incoming
            .get(id.as_u64() as usize)
            .into_iter()
            .flatten()
            .map(move |eid| &self.edges[eid.as_u64() as usize])
    }

    /// Vertices with the given label, in creation order
    pub fn vertices_by_label(&self, label: VertexLabel) -> impl Iterator<Item = &Vertex> + '_ {
        self.label_index
            .get(&label)
            .into_iter()
            .flatten()
            .map(move |id| &self.vertices[id.as_u64() as usize])
    }

    /// Edges with the given label, in creation order
    pub fn edges_by_label(&self, label: EdgeLabel) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_label_index
            .get(&label)
            .into_iter()
            .flatten()
            .map(move |id| &self.edges[id.as_u64() as usize])
    }

    pub fn all_vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn all_edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Rebuild a store from arena contents, e.g. a decoded snapshot.
    ///
    /// Ids must be dense and match positions; endpoints and natural keys must
    /// be consistent.
    pub fn restore(vertices: Vec<Vertex>, edges: Vec<Edge>) -> GraphResult<Self> {
        let mut store = GraphStore::new();

        for (pos, vertex) in vertices.into_iter().enumerate() {
            if vertex.id.as_u64() as usize != pos {
                return Err(GraphError::Corrupt(format!("vertex {} stored at position {}", vertex.id, pos)));
            }
            let slot = (vertex.label, vertex.key.clone());
            if store.key_index.insert(slot, vertex.id).is_some() {
                return Err(GraphError::Corrupt(format!(
                    "duplicate natural key {}:{}",
                    vertex.label, vertex.key
                )));
            }
            store.label_index.entry(vertex.label).or_default().push(vertex.id);
            store.vertices.push(vertex);
            store.outgoing.push(Vec::new());
            store.incoming.push(Vec::new());
        }

        for (pos, edge) in edges.into_iter().enumerate() {
            if edge.id.as_u64() as usize != pos {
                return Err(GraphError::Corrupt(format!("edge {} stored at position {}", edge.id, pos)));
            }
            store.check_endpoints(edge.source, edge.target)?;
            if edge.label.is_singleton() {
                store
                    .singleton_index
                    .entry((edge.label, edge.source, edge.target))
                    .or_insert(edge.id);
            }
            store.edge_label_index.entry(edge.label).or_default().push(edge.id);
            store.outgoing[edge.source.as_u64() as usize].push(edge.id);
            store.incoming[edge.target.as_u64() as usize].push(edge.id);
            store.edges.push(edge);
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;

    fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_upsert_vertex_is_idempotent() {
        let mut store = GraphStore::new();
        let attrs = props(&[("learningType", "visual".into())]);

        let first = store.upsert_vertex(VertexLabel::User, "u1", attrs.clone()).unwrap();
        let second = store.upsert_vertex(VertexLabel::User, "u1", attrs).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.vertex_count(), 1);
    }

    #[test]
    fn test_natural_keys_are_per_label() {
        let mut store = GraphStore::new();
        let concept = store.upsert_vertex(VertexLabel::Concept, "algebra", PropertyMap::new()).unwrap();
        let domain = store.upsert_vertex(VertexLabel::Domain, "algebra", PropertyMap::new()).unwrap();

        assert_ne!(concept.id, domain.id);
        assert_eq!(store.find_vertex(VertexLabel::Concept, "algebra"), Some(concept.id));
        assert_eq!(store.find_vertex(VertexLabel::Domain, "algebra"), Some(domain.id));
        assert_eq!(store.find_vertex(VertexLabel::User, "algebra"), None);
    }

    #[test]
    fn test_upsert_vertex_merges_last_write_wins() {
        let mut store = GraphStore::new();
        let id = store
            .upsert_vertex(VertexLabel::Concept, "sets", props(&[("difficulty", "easy".into())]))
            .unwrap()
            .id;
        store
            .upsert_vertex(
                VertexLabel::Concept,
                "sets",
                props(&[("difficulty", "hard".into()), ("domain", "mathematics".into())]),
            )
            .unwrap();

        let vertex = store.get_vertex(id).unwrap();
        assert_eq!(vertex.get_str("difficulty"), Some("hard"));
        assert_eq!(vertex.get_str("domain"), Some("mathematics"));
        assert_eq!(vertex.get_str("name"), Some("sets"));
    }

    #[test]
    fn test_get_or_create_does_not_merge() {
        let mut store = GraphStore::new();
        let id = store
            .get_or_create_vertex(VertexLabel::Concept, "sets", props(&[("domain", "general".into())]))
            .unwrap()
            .id;
        store
            .get_or_create_vertex(VertexLabel::Concept, "sets", props(&[("domain", "mathematics".into())]))
            .unwrap();

        assert_eq!(store.get_vertex(id).unwrap().get_str("domain"), Some("general"));
    }

    #[test]
    fn test_malformed_keys_rejected() {
        let mut store = GraphStore::new();
        assert!(matches!(
            store.upsert_vertex(VertexLabel::User, "", PropertyMap::new()),
            Err(GraphError::InvalidNaturalKey(_))
        ));
        assert!(matches!(
            store.upsert_vertex(VertexLabel::User, "a\u{0}b", PropertyMap::new()),
            Err(GraphError::InvalidNaturalKey(_))
        ));
        assert_eq!(store.vertex_count(), 0);
    }

    #[test]
    fn test_singleton_edges_merge() {
        let mut store = GraphStore::new();
        let u = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let c = store.upsert_vertex(VertexLabel::Concept, "c1", PropertyMap::new()).unwrap().id;

        let first = store
            .upsert_edge(EdgeLabel::Studies, u, c, props(&[("mastery", 0.3.into())]))
            .unwrap();
        let second = store
            .upsert_edge(EdgeLabel::Studies, u, c, props(&[("mastery", 0.51.into())]))
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.get_edge(first.id).unwrap().get_number("mastery"), Some(0.51));
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_append_only_edges_never_deduplicate() {
        let mut store = GraphStore::new();
        let u = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let a = store.upsert_vertex(VertexLabel::Activity, "a1", PropertyMap::new()).unwrap().id;

        let first = store.upsert_edge(EdgeLabel::Performed, u, a, PropertyMap::new()).unwrap();
        let second = store.upsert_edge(EdgeLabel::Performed, u, a, PropertyMap::new()).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.outgoing_edges(u).count(), 2);
        assert_eq!(store.incoming_edges(a).count(), 2);

        // find_or_create still deduplicates append-only labels
        let third = store.find_or_create_edge(EdgeLabel::Performed, u, a, PropertyMap::new()).unwrap();
        assert_eq!(third.id, first.id);
        assert!(!third.created);
    }

    #[test]
    fn test_edge_endpoints_must_exist() {
        let mut store = GraphStore::new();
        let u = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;

        assert_eq!(
            store.upsert_edge(EdgeLabel::Studies, u, NodeId::new(99), PropertyMap::new()),
            Err(GraphError::InvalidEdgeTarget(NodeId::new(99)))
        );
        assert_eq!(
            store.upsert_edge(EdgeLabel::Performed, NodeId::new(42), u, PropertyMap::new()),
            Err(GraphError::InvalidEdgeSource(NodeId::new(42)))
        );
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_label_indexes() {
        let mut store = GraphStore::new();
        let u = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let c1 = store.upsert_vertex(VertexLabel::Concept, "c1", PropertyMap::new()).unwrap().id;
        let c2 = store.upsert_vertex(VertexLabel::Concept, "c2", PropertyMap::new()).unwrap().id;
        store.upsert_edge(EdgeLabel::Studies, u, c1, PropertyMap::new()).unwrap();
        store.upsert_edge(EdgeLabel::PrerequisiteOf, c1, c2, PropertyMap::new()).unwrap();

        let concepts: Vec<NodeId> = store.vertices_by_label(VertexLabel::Concept).map(|v| v.id).collect();
        assert_eq!(concepts, vec![c1, c2]);
        assert_eq!(store.edges_by_label(EdgeLabel::Studies).count(), 1);
        assert_eq!(store.edges_by_label(EdgeLabel::Mastered).count(), 0);
    }

    #[test]
    fn test_restore_rebuilds_indexes() {
        let mut store = GraphStore::new();
        let u = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let c = store.upsert_vertex(VertexLabel::Concept, "c1", PropertyMap::new()).unwrap().id;
        let e = store.upsert_edge(EdgeLabel::Studies, u, c, PropertyMap::new()).unwrap().id;

        let restored = GraphStore::restore(store.all_vertices().to_vec(), store.all_edges().to_vec()).unwrap();

        assert_eq!(restored.find_vertex(VertexLabel::Concept, "c1"), Some(c));
        assert_eq!(restored.find_edge(EdgeLabel::Studies, u, c), Some(e));
        assert_eq!(restored.outgoing_edges(u).count(), 1);
    }

    #[test]
    fn test_restore_rejects_dangling_edge() {
        let mut store = GraphStore::new();
        let u = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let c = store.upsert_vertex(VertexLabel::Concept, "c1", PropertyMap::new()).unwrap().id;
        store.upsert_edge(EdgeLabel::Studies, u, c, PropertyMap::new()).unwrap();

        let vertices = store.all_vertices()[..1].to_vec();
        let result = GraphStore::restore(vertices, store.all_edges().to_vec());
        assert_eq!(result.err(), Some(GraphError::InvalidEdgeTarget(c)));
    }
}
