//! Learning analytics
//!
//! The traversal and ranking kernels live in `learngraph-algorithms`. This
//! module is the adapter layer: it resolves natural keys, projects the store
//! into the kernels' inputs, and maps results back to names.

pub mod community;
pub mod cycles;
pub mod insights;
pub mod pagerank;
pub mod pathfinding;

use crate::error::{EngineError, EngineResult};
use crate::graph::{Edge, EdgeLabel, GraphStore, NodeId, VertexLabel};
use learngraph_algorithms::{Adjacency, GraphView, NodeId as AlgoNodeId};
use rustc_hash::FxHashSet;

pub use community::{find_communities, find_similar_learners, LearnerMatch};
pub use cycles::{detect_cycles, CycleKind, LearningCycle};
pub use insights::{
    analyze_learning_patterns, get_concept_recommendations, get_user_knowledge_graph, KnowledgeConcept,
    KnowledgeGraph, KnowledgeRelationship, LearningPatterns, Recommendation,
};
pub use pagerank::{compute_importance, ConceptImportance};
pub use pathfinding::{find_learning_paths, LearningPath};

/// Project `nodes` and the edges between them that pass `filter`
pub fn build_view<F>(store: &GraphStore, nodes: &[NodeId], filter: F) -> GraphView
where
    F: Fn(&Edge) -> bool,
{
    let filter = &filter;
    let edges: Vec<(AlgoNodeId, AlgoNodeId)> = nodes
        .iter()
        .flat_map(|&id| {
            store
                .outgoing_edges(id)
                .filter(move |edge| filter(edge))
                .map(|edge| (edge.source.as_u64(), edge.target.as_u64()))
        })
        .collect();
    let ids = nodes.iter().map(NodeId::as_u64).collect();
    GraphView::from_edges(ids, edges)
}

/// Live adjacency over the store, following only edges that pass `filter`
pub(crate) struct StoreAdjacency<'a, F> {
    store: &'a GraphStore,
    filter: F,
}

impl<'a, F> StoreAdjacency<'a, F>
where
    F: Fn(&Edge) -> bool,
{
    pub(crate) fn new(store: &'a GraphStore, filter: F) -> Self {
        Self { store, filter }
    }
}

impl<F> Adjacency for StoreAdjacency<'_, F>
where
    F: Fn(&Edge) -> bool,
{
    fn successors(&self, node: AlgoNodeId) -> Vec<AlgoNodeId> {
        self.store
            .outgoing_edges(NodeId::new(node))
            .filter(|edge| (self.filter)(edge))
            .map(|edge| edge.target.as_u64())
            .collect()
    }
}

/// Resolve a natural key or fail with `NotFound`
pub(crate) fn require_vertex(store: &GraphStore, label: VertexLabel, key: &str) -> EngineResult<NodeId> {
    store
        .find_vertex(label, key)
        .ok_or_else(|| EngineError::NotFound(format!("{} {:?}", label, key)))
}

pub(crate) fn is_label(store: &GraphStore, id: NodeId, label: VertexLabel) -> bool {
    store.get_vertex(id).map_or(false, |v| v.label == label)
}

/// Natural key of a vertex, empty for unknown ids
pub(crate) fn key_of(store: &GraphStore, id: NodeId) -> String {
    store
        .get_vertex(id)
        .map(|v| v.key.as_str().to_string())
        .unwrap_or_default()
}

/// Targets of `label` edges leaving `from`
pub(crate) fn out_neighbors(store: &GraphStore, from: NodeId, label: EdgeLabel) -> impl Iterator<Item = NodeId> + '_ {
    store
        .outgoing_edges(from)
        .filter(move |edge| edge.label == label)
        .map(|edge| edge.target)
}

/// Sources of `label` edges entering `to`
pub(crate) fn in_neighbors(store: &GraphStore, to: NodeId, label: EdgeLabel) -> impl Iterator<Item = NodeId> + '_ {
    store
        .incoming_edges(to)
        .filter(move |edge| edge.label == label)
        .map(|edge| edge.source)
}

/// `(activity, concept)` pairs for every `user -PERFORMED-> activity
/// -RELATED_TO-> concept` walk, in edge order
pub(crate) fn activity_concepts(store: &GraphStore, user: NodeId) -> Vec<(NodeId, NodeId)> {
    out_neighbors(store, user, EdgeLabel::Performed)
        .flat_map(|activity| {
            out_neighbors(store, activity, EdgeLabel::RelatedTo)
                .filter(move |&c| is_label(store, c, VertexLabel::Concept))
                .map(move |concept| (activity, concept))
        })
        .collect()
}

/// Distinct ids in first-seen order
pub(crate) fn dedup_ordered(ids: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
    let mut seen = FxHashSet::default();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
