//! Concept importance within a domain

use super::{build_view, in_neighbors, is_label, key_of, require_vertex};
use crate::error::{EngineError, EngineResult};
use crate::graph::{EdgeLabel, GraphStore, NodeId, VertexLabel};
use learngraph_algorithms::{page_rank, Interrupt, PageRankConfig};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptImportance {
    pub concept: String,
    #[serde(skip)]
    pub node: NodeId,
    pub importance: f64,
}

/// PageRank over the concepts that belong to `domain`.
///
/// The subgraph is induced: only edges between two concepts of the domain
/// count, and out-degree is measured inside it.
pub fn compute_importance(
    store: &GraphStore,
    domain: &str,
    config: PageRankConfig,
    interrupt: &Interrupt,
) -> EngineResult<Vec<ConceptImportance>> {
    if !(0.0..=1.0).contains(&config.damping_factor) {
        return Err(EngineError::Validation(format!(
            "damping must be within [0, 1], got {}",
            config.damping_factor
        )));
    }

    let domain_id = require_vertex(store, VertexLabel::Domain, domain)?;
    let concepts: Vec<NodeId> = in_neighbors(store, domain_id, EdgeLabel::BelongsTo)
        .filter(|&id| is_label(store, id, VertexLabel::Concept))
        .collect();

    let view = build_view(store, &concepts, |_| true);
    let scores = page_rank(&view, config, interrupt)?;

    let mut ranked: Vec<ConceptImportance> = scores
        .into_iter()
        .map(|(id, importance)| {
            let node = NodeId::new(id);
            ConceptImportance {
                concept: key_of(store, node),
                node,
                importance,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance).then_with(|| a.concept.cmp(&b.concept)));

    debug!(domain, concepts = ranked.len(), iterations = config.iterations, "concept importance computed");
    Ok(ranked)
}
