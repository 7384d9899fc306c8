//! Bounded simple-cycle enumeration
//!
//! For each start node, a depth-first search over an explicit stack looks for
//! edges that close back onto the start without revisiting any other node.
//! Rotations of the same cycle found from different starts are reported once.

use super::common::{Adjacency, NodeId};
use super::interrupt::{Interrupt, Interrupted};
use super::paths::Frame;
use rustc_hash::FxHashSet;

/// Bounds for [`simple_cycles`]
#[derive(Debug, Clone, Copy)]
pub struct CycleSearchConfig {
    /// Longest cycle to look for, in edges
    pub max_length: usize,
    /// Stop after this many distinct cycles
    pub max_cycles: usize,
}

impl Default for CycleSearchConfig {
    fn default() -> Self {
        Self {
            max_length: 8,
            max_cycles: 10,
        }
    }
}

/// Rotate so the smallest node id comes first; direction is preserved.
fn canonical(cycle: &[NodeId]) -> Vec<NodeId> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle[pivot..].iter().chain(cycle[..pivot].iter()).copied().collect()
}

/// Enumerate simple cycles through any of `starts`.
///
/// Each cycle is returned as its node sequence beginning at the start it was
/// discovered from, without repeating the start at the end: `A -> B -> C -> A`
/// is `[A, B, C]`, and its length in edges equals the vector length.
pub fn simple_cycles<A: Adjacency>(
    graph: &A,
    starts: &[NodeId],
    config: &CycleSearchConfig,
    interrupt: &Interrupt,
) -> Result<Vec<Vec<NodeId>>, Interrupted> {
    let mut found = Vec::new();
    let mut reported: FxHashSet<Vec<NodeId>> = FxHashSet::default();

    if config.max_cycles == 0 || config.max_length == 0 {
        return Ok(found);
    }

    for &start in starts {
        let mut path = vec![start];
        let mut on_path = FxHashSet::default();
        on_path.insert(start);
        let mut stack = vec![Frame::expand(graph, start)];

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

            if next == start {
                // Closing edge: cycle length equals the current path length.
                if reported.insert(canonical(&path)) {
                    found.push(path.clone());
                    if found.len() >= config.max_cycles {
                        return Ok(found);
                    }
                }
                continue;
            }

            if on_path.contains(&next) {
                continue;
            }

            if path.len() < config.max_length {
                path.push(next);
                on_path.insert(next);
                stack.push(Frame::expand(graph, next));
            }
        }
    }

    Ok(found)
}
