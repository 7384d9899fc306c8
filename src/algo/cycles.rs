//! Study-loop detection
//!
//! Looks for closed walks among the concepts a user has studied, following
//! concept-to-concept RELATED_TO and PREREQUISITE_OF edges. A cycle in
//! PREREQUISITE_OF is a data-quality problem; a cycle in RELATED_TO hints at a
//! learner circling without progressing. Either way the result is reported,
//! never repaired.

use super::{activity_concepts, dedup_ordered, is_label, key_of, out_neighbors, require_vertex, StoreAdjacency};
use crate::error::{EngineError, EngineResult};
use crate::graph::{Edge, EdgeLabel, GraphStore, NodeId, VertexLabel};
use learngraph_algorithms::{simple_cycles, CycleSearchConfig, Interrupt};
use serde::Serialize;
use tracing::debug;

/// Cycle size class, by number of edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    Short,
    Medium,
    Long,
}

impl CycleKind {
    pub fn classify(length: usize) -> Self {
        match length {
            0..=3 => CycleKind::Short,
            4..=5 => CycleKind::Medium,
            _ => CycleKind::Long,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningCycle {
    /// Concept names, starting at a concept the user studied
    pub concepts: Vec<String>,
    #[serde(skip)]
    pub nodes: Vec<NodeId>,
    /// Number of edges, equal to the number of distinct concepts
    pub length: usize,
    #[serde(rename = "type")]
    pub kind: CycleKind,
}

/// Concepts the user studied: STUDIES targets, then concepts of their activities
fn studied_concepts(store: &GraphStore, user: NodeId) -> Vec<NodeId> {
    let studies = out_neighbors(store, user, EdgeLabel::Studies);
    let activities = activity_concepts(store, user).into_iter().map(|(_, c)| c);
    dedup_ordered(studies.chain(activities))
}

fn concept_link(store: &GraphStore) -> impl Fn(&Edge) -> bool + '_ {
    move |edge: &Edge| {
        matches!(edge.label, EdgeLabel::RelatedTo | EdgeLabel::PrerequisiteOf)
            && is_label(store, edge.target, VertexLabel::Concept)
    }
}

/// Up to `limit` distinct cycles through the user's studied concepts, each
/// at most `max_length` edges long.
pub fn detect_cycles(
    store: &GraphStore,
    user_id: &str,
    limit: usize,
    max_length: usize,
    interrupt: &Interrupt,
) -> EngineResult<Vec<LearningCycle>> {
    if limit == 0 || max_length == 0 {
        return Err(EngineError::Validation(
            "limit and max cycle length must be positive".to_string(),
        ));
    }
    let user = require_vertex(store, VertexLabel::User, user_id)?;

    let starts: Vec<u64> = studied_concepts(store, user)
        .into_iter()
        .filter(|&id| is_label(store, id, VertexLabel::Concept))
        .map(|id| id.as_u64())
        .collect();

    let adjacency = StoreAdjacency::new(store, concept_link(store));
    let config = CycleSearchConfig {
        max_length,
        max_cycles: limit,
    };
    let raw = simple_cycles(&adjacency, &starts, &config, interrupt)?;

    let cycles: Vec<LearningCycle> = raw
        .into_iter()
        .map(|ids| {
            let nodes: Vec<NodeId> = ids.into_iter().map(NodeId::new).collect();
            LearningCycle {
                concepts: nodes.iter().map(|&id| key_of(store, id)).collect(),
                length: nodes.len(),
                kind: CycleKind::classify(nodes.len()),
                nodes,
            }
        })
        .collect();

    debug!(user = user_id, starts = starts.len(), cycles = cycles.len(), "cycle detection finished");
    Ok(cycles)
}
