//! Learning-path discovery
//!
//! Paths are simple paths between two concepts over edges of any label,
//! scored by how well the user already knows the concepts along them.

use super::{key_of, require_vertex, StoreAdjacency};
use crate::error::{EngineError, EngineResult};
use crate::graph::{Edge, GraphStore, NodeId, VertexLabel};
use crate::mastery::current_mastery;
use learngraph_algorithms::{simple_paths, Interrupt, PathSearchConfig};
use serde::Serialize;
use tracing::debug;

/// A scored path between two concepts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningPath {
    /// Natural keys along the path, source first
    pub concepts: Vec<String>,
    #[serde(skip)]
    pub nodes: Vec<NodeId>,
    /// Mean mastery over the Concept vertices of the path
    pub score: f64,
    pub hops: usize,
}

/// Mean of the user's mastery over the Concept vertices in `path`
fn score_path(store: &GraphStore, user: NodeId, path: &[NodeId]) -> f64 {
    let masteries: Vec<f64> = path
        .iter()
        .filter(|&&id| super::is_label(store, id, VertexLabel::Concept))
        .map(|&id| current_mastery(store, user, id))
        .collect();
    if masteries.is_empty() {
        return 0.0;
    }
    masteries.iter().sum::<f64>() / masteries.len() as f64
}

/// Bounded simple paths from `from` to `to`, best first.
///
/// Ordered by descending score, then fewer hops, then discovery order.
pub fn find_learning_paths(
    store: &GraphStore,
    user_id: &str,
    from: &str,
    to: &str,
    config: &PathSearchConfig,
    interrupt: &Interrupt,
) -> EngineResult<Vec<LearningPath>> {
    if config.max_paths == 0 || config.max_depth == 0 {
        return Err(EngineError::Validation(
            "max_paths and max_depth must be positive".to_string(),
        ));
    }

    let user = require_vertex(store, VertexLabel::User, user_id)?;
    let source = require_vertex(store, VertexLabel::Concept, from)?;
    let target = require_vertex(store, VertexLabel::Concept, to)?;

    let adjacency = StoreAdjacency::new(store, |_: &Edge| true);
    let raw = simple_paths(&adjacency, source.as_u64(), target.as_u64(), config, interrupt)?;

    let mut paths: Vec<LearningPath> = raw
        .into_iter()
        .map(|ids| {
            let nodes: Vec<NodeId> = ids.into_iter().map(NodeId::new).collect();
            LearningPath {
                concepts: nodes.iter().map(|&id| key_of(store, id)).collect(),
                score: score_path(store, user, &nodes),
                hops: nodes.len().saturating_sub(1),
                nodes,
            }
        })
        .collect();

    // Stable sort keeps discovery order among equals
    paths.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.hops.cmp(&b.hops)));

    debug!(user = user_id, from, to, found = paths.len(), "learning paths computed");
    Ok(paths)
}
