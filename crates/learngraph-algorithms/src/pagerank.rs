//! PageRank algorithm implementation
//!
//! Synchronous (Jacobi) iteration: every score of round `k + 1` is computed
//! from the full score vector of round `k`, which keeps results independent
//! of visit order and lets the per-node updates run in parallel.
//!
//! Nodes without outgoing edges keep their mass; it is not redistributed.

use super::common::{GraphView, NodeId};
use super::interrupt::{Interrupt, Interrupted};
use rayon::prelude::*;
use std::collections::HashMap;

/// Below this size the sequential loop beats rayon's scheduling overhead.
const PARALLEL_THRESHOLD: usize = 4096;

/// PageRank configuration
#[derive(Debug, Clone, Copy)]
pub struct PageRankConfig {
    /// Damping factor (usually 0.85)
    pub damping_factor: f64,
    /// Number of iterations
    pub iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            iterations: 3,
        }
    }
}

fn incoming_mass(view: &GraphView, scores: &[f64], idx: usize) -> f64 {
    view.predecessors(idx)
        .iter()
        .map(|&source_idx| scores[source_idx] / view.out_degree(source_idx) as f64)
        .sum()
}

/// Calculate PageRank for the graph view
pub fn page_rank(
    view: &GraphView,
    config: PageRankConfig,
    interrupt: &Interrupt,
) -> Result<HashMap<NodeId, f64>, Interrupted> {
    let n = view.node_count;

    if n == 0 {
        return Ok(HashMap::new());
    }

    let uniform = 1.0 / n as f64;
    let mut scores = vec![uniform; n];
    let mut next_scores = vec![0.0; n];

    let d = config.damping_factor;
    let base_score = (1.0 - d) * uniform;

    for _ in 0..config.iterations {
        interrupt.check()?;

        if n >= PARALLEL_THRESHOLD {
            next_scores
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, slot)| *slot = base_score + d * incoming_mass(view, &scores, i));
        } else {
            for (i, slot) in next_scores.iter_mut().enumerate() {
                *slot = base_score + d * incoming_mass(view, &scores, i);
            }
        }

        std::mem::swap(&mut scores, &mut next_scores);
    }

    let mut result = HashMap::with_capacity(n);
    for (idx, score) in scores.into_iter().enumerate() {
        result.insert(view.index_to_node[idx], score);
    }

    Ok(result)
}
