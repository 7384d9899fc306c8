//! Learner communities by shared concepts
//!
//! Two learners are linked through a concept when both performed an activity
//! related to it: `user -> Activity -> Concept <- Activity <- other`.

use super::{activity_concepts, dedup_ordered, in_neighbors, is_label, key_of, require_vertex};
use crate::error::{EngineError, EngineResult};
use crate::graph::{EdgeLabel, GraphStore, NodeId, VertexLabel};
use learngraph_algorithms::Interrupt;
use serde::Serialize;
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerMatch {
    pub user_id: String,
    /// Number of co-occurrence walks reaching this learner
    pub score: usize,
}

/// Count, per other learner, the walks that reach them through `concepts`.
fn count_learners(
    store: &GraphStore,
    user: NodeId,
    concepts: &[NodeId],
    interrupt: &Interrupt,
) -> EngineResult<FxHashMap<NodeId, usize>> {
    let mut counts: FxHashMap<NodeId, usize> = FxHashMap::default();
    for &concept in concepts {
        interrupt.check()?;
        for activity in in_neighbors(store, concept, EdgeLabel::RelatedTo) {
            for other in in_neighbors(store, activity, EdgeLabel::Performed) {
                if other != user && is_label(store, other, VertexLabel::User) {
                    *counts.entry(other).or_insert(0) += 1;
                }
            }
        }
    }
    Ok(counts)
}

fn rank(store: &GraphStore, counts: FxHashMap<NodeId, usize>, limit: usize) -> Vec<LearnerMatch> {
    let mut matches: Vec<LearnerMatch> = counts
        .into_iter()
        .map(|(id, score)| LearnerMatch {
            user_id: key_of(store, id),
            score,
        })
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.user_id.cmp(&b.user_id)));
    matches.truncate(limit);
    matches
}

fn check_limit(limit: usize) -> EngineResult<()> {
    if limit == 0 {
        return Err(EngineError::Validation("limit must be positive".to_string()));
    }
    Ok(())
}

/// Learners who co-occur with `user_id`, scored by the number of two-hop
/// walks between them. A concept the user met in three activities counts
/// three times.
pub fn find_communities(
    store: &GraphStore,
    user_id: &str,
    limit: usize,
    interrupt: &Interrupt,
) -> EngineResult<Vec<LearnerMatch>> {
    check_limit(limit)?;
    let user = require_vertex(store, VertexLabel::User, user_id)?;

    let walks: Vec<NodeId> = activity_concepts(store, user).into_iter().map(|(_, c)| c).collect();
    let counts = count_learners(store, user, &walks, interrupt)?;
    let matches = rank(store, counts, limit);

    debug!(user = user_id, matches = matches.len(), "communities computed");
    Ok(matches)
}

/// Like [`find_communities`] but each of the user's concepts counts once.
pub fn find_similar_learners(
    store: &GraphStore,
    user_id: &str,
    limit: usize,
    interrupt: &Interrupt,
) -> EngineResult<Vec<LearnerMatch>> {
    check_limit(limit)?;
    let user = require_vertex(store, VertexLabel::User, user_id)?;

    let concepts = dedup_ordered(activity_concepts(store, user).into_iter().map(|(_, c)| c));
    let counts = count_learners(store, user, &concepts, interrupt)?;
    Ok(rank(store, counts, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyMap;

    fn perform(store: &mut GraphStore, user: &str, activity: &str, concept: &str) {
        let u = store.get_or_create_vertex(VertexLabel::User, user, PropertyMap::new()).unwrap().id;
        let a = store.get_or_create_vertex(VertexLabel::Activity, activity, PropertyMap::new()).unwrap().id;
        let c = store.get_or_create_vertex(VertexLabel::Concept, concept, PropertyMap::new()).unwrap().id;
        store.upsert_edge(EdgeLabel::Performed, u, a, PropertyMap::new()).unwrap();
        store.upsert_edge(EdgeLabel::RelatedTo, a, c, PropertyMap::new()).unwrap();
    }

    fn fixture() -> GraphStore {
        let mut store = GraphStore::new();
        perform(&mut store, "alice", "a1", "algebra");
        perform(&mut store, "alice", "a2", "algebra");
        perform(&mut store, "alice", "a3", "geometry");
        perform(&mut store, "bob", "b1", "algebra");
        perform(&mut store, "carol", "c1", "geometry");
        perform(&mut store, "carol", "c2", "algebra");
        perform(&mut store, "dave", "d1", "poetry");
        store
    }

    #[test]
    fn test_communities_count_every_walk() {
        let store = fixture();
        let matches = find_communities(&store, "alice", 10, &Interrupt::new()).unwrap();

        // algebra walked twice: bob 2, carol 2; geometry once: carol 1
        assert_eq!(
            matches,
            vec![
                LearnerMatch { user_id: "carol".to_string(), score: 3 },
                LearnerMatch { user_id: "bob".to_string(), score: 2 },
            ]
        );
    }

    #[test]
    fn test_similar_learners_count_distinct_concepts() {
        let store = fixture();
        let matches = find_similar_learners(&store, "alice", 10, &Interrupt::new()).unwrap();

        assert_eq!(
            matches,
            vec![
                LearnerMatch { user_id: "carol".to_string(), score: 2 },
                LearnerMatch { user_id: "bob".to_string(), score: 1 },
            ]
        );
    }

    #[test]
    fn test_limit_and_isolated_user() {
        let store = fixture();
        assert_eq!(find_communities(&store, "alice", 1, &Interrupt::new()).unwrap().len(), 1);
        assert!(find_communities(&store, "dave", 5, &Interrupt::new()).unwrap().is_empty());
        assert!(matches!(
            find_communities(&store, "alice", 0, &Interrupt::new()),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            find_similar_learners(&store, "nobody", 5, &Interrupt::new()),
            Err(EngineError::NotFound(_))
        ));
    }
}
