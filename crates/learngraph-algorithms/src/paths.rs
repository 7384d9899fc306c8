//! Bounded simple-path enumeration
//!
//! Depth-first search over an explicit stack. Exploration stops once
//! `max_paths` paths have been found or every branch hits `max_depth` hops,
//! so the search terminates on arbitrarily large or cyclic graphs.

use super::common::{Adjacency, NodeId};
use super::interrupt::{Interrupt, Interrupted};
use rustc_hash::FxHashSet;

/// Bounds for [`simple_paths`]
#[derive(Debug, Clone, Copy)]
pub struct PathSearchConfig {
    /// Maximum number of hops (edges) in a path
    pub max_depth: usize,
    /// Stop after this many paths
    pub max_paths: usize,
}

impl Default for PathSearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_paths: 5,
        }
    }
}

/// One level of the explicit DFS stack.
pub(crate) struct Frame {
    pub(crate) successors: Vec<NodeId>,
    pub(crate) cursor: usize,
}

impl Frame {
    /// Successors with parallel edges collapsed, keeping first-seen order.
    pub(crate) fn expand<A: Adjacency>(graph: &A, node: NodeId) -> Self {
        let mut seen = FxHashSet::default();
        let successors = graph
            .successors(node)
            .into_iter()
            .filter(|n| seen.insert(*n))
            .collect();
        Frame {
            successors,
            cursor: 0,
        }
    }
}

/// Enumerate simple paths (no repeated vertex) from `source` to `target`,
/// in discovery order.
///
/// A zero-hop path `[source]` is returned when `source == target`.
pub fn simple_paths<A: Adjacency>(
    graph: &A,
    source: NodeId,
    target: NodeId,
    config: &PathSearchConfig,
    interrupt: &Interrupt,
) -> Result<Vec<Vec<NodeId>>, Interrupted> {
    let mut found = Vec::new();
    if config.max_paths == 0 {
        return Ok(found);
    }
    if source == target {
        found.push(vec![source]);
        return Ok(found);
    }
    if config.max_depth == 0 {
        return Ok(found);
    }

    let mut path = vec![source];
    let mut on_path = FxHashSet::default();
    on_path.insert(source);
    let mut stack = vec![Frame::expand(graph, source)];

    while let Some(frame) = stack.last_mut() {
        interrupt.check()?;

        let next = frame.successors.get(frame.cursor).copied();
        let next = match next {
            Some(n) => {
                frame.cursor += 1;
                n
            }
            None => {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
                continue;
            }
        };

        if on_path.contains(&next) {
            continue;
        }

        // Hops taken once `next` is appended.
        let hops = path.len();

        if next == target {
            let mut complete = path.clone();
            complete.push(next);
            found.push(complete);
            if found.len() >= config.max_paths {
                break;
            }
            continue;
        }

        if hops < config.max_depth {
            path.push(next);
            on_path.insert(next);
            stack.push(Frame::expand(graph, next));
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::GraphView;

    fn diamond() -> GraphView {
        // 1 -> 2 -> 3, 1 -> 3
        GraphView::from_edges(vec![1, 2, 3], vec![(1, 2), (2, 3), (1, 3)])
    }

    #[test]
    fn test_finds_all_simple_paths() {
        let view = diamond();
        let paths = simple_paths(&view, 1, 3, &PathSearchConfig::default(), &Interrupt::new()).unwrap();

        assert_eq!(paths, vec![vec![1, 2, 3], vec![1, 3]]);
    }

    #[test]
    fn test_depth_bound() {
        let view = diamond();
        let config = PathSearchConfig { max_depth: 1, max_paths: 5 };
        let paths = simple_paths(&view, 1, 3, &config, &Interrupt::new()).unwrap();

        assert_eq!(paths, vec![vec![1, 3]]);
    }

    #[test]
    fn test_path_bound() {
        let view = diamond();
        let config = PathSearchConfig { max_depth: 5, max_paths: 1 };
        let paths = simple_paths(&view, 1, 3, &config, &Interrupt::new()).unwrap();

        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn test_cycles_do_not_loop() {
        // 1 <-> 2 <-> 3 with no way to 4
        let view = GraphView::from_edges(
            vec![1, 2, 3, 4],
            vec![(1, 2), (2, 1), (2, 3), (3, 2), (3, 1)],
        );
        let paths = simple_paths(&view, 1, 4, &PathSearchConfig::default(), &Interrupt::new()).unwrap();
        assert!(paths.is_empty());

        let paths = simple_paths(&view, 1, 3, &PathSearchConfig::default(), &Interrupt::new()).unwrap();
        assert_eq!(paths, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_parallel_edges_yield_one_path() {
        let view = GraphView::from_edges(vec![1, 2], vec![(1, 2), (1, 2)]);
        let paths = simple_paths(&view, 1, 2, &PathSearchConfig::default(), &Interrupt::new()).unwrap();
        assert_eq!(paths, vec![vec![1, 2]]);
    }

    #[test]
    fn test_cancelled_search_fails() {
        let view = diamond();
        let interrupt = Interrupt::new();
        interrupt.cancel();

        let result = simple_paths(&view, 1, 3, &PathSearchConfig::default(), &interrupt);
        assert!(result.is_err());
    }
}
