//! Shared utilities for graph algorithms
//!
//! Provides a read-only, dense view of a graph projection and the
//! `Adjacency` seam that lets traversals run directly against a live store.

use std::collections::HashMap;

/// Node Identifier type (u64)
pub type NodeId = u64;

/// Successor lookup used by the bounded traversals.
///
/// Implemented by [`GraphView`] and by store adapters that filter edges on
/// the fly, so path and cycle searches never need a full projection.
pub trait Adjacency {
    /// Outgoing neighbours of `node`, in a stable order.
    fn successors(&self, node: NodeId) -> Vec<NodeId>;
}

/// A dense, integer-indexed view of the graph topology using Compressed Sparse Row (CSR) format.
#[derive(Debug, Clone)]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Offsets into `out_targets`. Size = node_count + 1
    pub out_offsets: Vec<usize>,
    /// Contiguous array of target node indices
    pub out_targets: Vec<usize>,

    /// Offsets into `in_sources`. Size = node_count + 1
    pub in_offsets: Vec<usize>,
    /// Contiguous array of source node indices
    pub in_sources: Vec<usize>,
}

impl GraphView {
    /// Build a view over `nodes`, keeping only edges whose endpoints are both
    /// in the node set (an induced subgraph). Duplicate node ids are ignored.
    pub fn from_edges<I>(nodes: Vec<NodeId>, edges: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut index_to_node = Vec::with_capacity(nodes.len());
        let mut node_to_index = HashMap::with_capacity(nodes.len());

        for node_id in nodes {
            if !node_to_index.contains_key(&node_id) {
                node_to_index.insert(node_id, index_to_node.len());
                index_to_node.push(node_id);
            }
        }

        let node_count = index_to_node.len();
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];

        for (source, target) in edges {
            if let (Some(&u), Some(&v)) = (node_to_index.get(&source), node_to_index.get(&target)) {
                outgoing[u].push(v);
                incoming[v].push(u);
            }
        }

        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::new();
        out_offsets.push(0);
        for neighbors in outgoing {
            out_targets.extend(neighbors);
            out_offsets.push(out_targets.len());
        }

        let mut in_offsets = Vec::with_capacity(node_count + 1);
        let mut in_sources = Vec::new();
        in_offsets.push(0);
        for sources in incoming {
            in_sources.extend(sources);
            in_offsets.push(in_sources.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
        }
    }

    /// Get the out-degree of a node (by index)
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Get the in-degree of a node (by index)
    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_offsets[idx + 1] - self.in_offsets[idx]
    }

    /// Get outgoing neighbors (successors) of a node
    pub fn successor_indices(&self, idx: usize) -> &[usize] {
        &self.out_targets[self.out_offsets[idx]..self.out_offsets[idx + 1]]
    }

    /// Get incoming neighbors (predecessors) of a node
    pub fn predecessors(&self, idx: usize) -> &[usize] {
        &self.in_sources[self.in_offsets[idx]..self.in_offsets[idx + 1]]
    }
}

impl Adjacency for GraphView {
    fn successors(&self, node: NodeId) -> Vec<NodeId> {
        match self.node_to_index.get(&node) {
            Some(&idx) => self
                .successor_indices(idx)
                .iter()
                .map(|&t| self.index_to_node[t])
                .collect(),
            None => Vec::new(),
        }
    }
}
