//! Per-learner read models: knowledge graph, recommendations and study patterns

use super::{activity_concepts, dedup_ordered, is_label, key_of, out_neighbors, require_vertex};
use crate::error::{EngineError, EngineResult};
use crate::graph::{EdgeLabel, GraphStore, PropertyValue, VertexLabel};
use crate::mastery::current_mastery;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeConcept {
    pub name: String,
    pub mastery: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeRelationship {
    pub source: String,
    pub label: EdgeLabel,
    pub target: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Concepts a learner has touched and how they connect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeGraph {
    pub concepts: Vec<KnowledgeConcept>,
    pub relationships: Vec<KnowledgeRelationship>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub concept: String,
    /// Number of mastered concepts pointing at this one
    pub score: usize,
}

/// Aggregates over a learner's activities
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPatterns {
    /// Mean performance by hour of day (UTC)
    pub time_patterns: BTreeMap<u32, f64>,
    /// Mean performance by concept difficulty
    pub difficulty_patterns: BTreeMap<String, f64>,
    /// Activity count by concept domain
    pub velocity_patterns: BTreeMap<String, usize>,
}

const UNKNOWN: &str = "unknown";

/// Concepts reached through activities or STUDIES edges, with the user's
/// mastery, plus every outgoing edge of those concepts.
pub fn get_user_knowledge_graph(store: &GraphStore, user_id: &str) -> EngineResult<KnowledgeGraph> {
    let user = require_vertex(store, VertexLabel::User, user_id)?;
    let activities = activity_concepts(store, user).into_iter().map(|(_, c)| c);
    let concepts = dedup_ordered(activities.chain(out_neighbors(store, user, EdgeLabel::Studies)));

    let mut relationships = Vec::new();
    for &concept in &concepts {
        for edge in store.outgoing_edges(concept) {
            relationships.push(KnowledgeRelationship {
                source: key_of(store, concept),
                label: edge.label,
                target: key_of(store, edge.target),
                properties: edge
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            });
        }
    }

    Ok(KnowledgeGraph {
        concepts: concepts
            .iter()
            .map(|&id| KnowledgeConcept {
                name: key_of(store, id),
                mastery: current_mastery(store, user, id),
            })
            .collect(),
        relationships,
    })
}

/// Concepts one hop beyond what the user has mastered, most-linked first
pub fn get_concept_recommendations(
    store: &GraphStore,
    user_id: &str,
    limit: usize,
) -> EngineResult<Vec<Recommendation>> {
    if limit == 0 {
        return Err(EngineError::Validation("limit must be positive".to_string()));
    }
    let user = require_vertex(store, VertexLabel::User, user_id)?;
    let mastered: FxHashSet<_> = out_neighbors(store, user, EdgeLabel::Mastered).collect();

    let mut counts = FxHashMap::default();
    for &concept in &mastered {
        for edge in store.outgoing_edges(concept) {
            let next = edge.target;
            if !mastered.contains(&next) && is_label(store, next, VertexLabel::Concept) {
                *counts.entry(next).or_insert(0usize) += 1;
            }
        }
    }

    let mut recommendations: Vec<Recommendation> = counts
        .into_iter()
        .map(|(id, score)| Recommendation {
            concept: key_of(store, id),
            score,
        })
        .collect();
    recommendations.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.concept.cmp(&b.concept)));
    recommendations.truncate(limit);
    Ok(recommendations)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Hour, difficulty and domain aggregates over the user's activities.
///
/// Activities without a performance or timestamp are left out of the
/// aggregates that need them.
pub fn analyze_learning_patterns(store: &GraphStore, user_id: &str) -> EngineResult<LearningPatterns> {
    let user = require_vertex(store, VertexLabel::User, user_id)?;

    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for activity in out_neighbors(store, user, EdgeLabel::Performed) {
        let Some(vertex) = store.get_vertex(activity) else { continue };
        let performance = vertex.get_number("performance");
        let hour = vertex
            .get_property("timestamp")
            .and_then(PropertyValue::as_datetime)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.hour());
        if let (Some(performance), Some(hour)) = (performance, hour) {
            by_hour.entry(hour).or_default().push(performance);
        }
    }

    let mut by_difficulty: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut by_domain: BTreeMap<String, usize> = BTreeMap::new();
    for (activity, concept) in activity_concepts(store, user) {
        let Some(concept) = store.get_vertex(concept) else { continue };
        let domain = concept.get_str("domain").unwrap_or(UNKNOWN);
        *by_domain.entry(domain.to_string()).or_insert(0) += 1;

        if let Some(performance) = store.get_vertex(activity).and_then(|a| a.get_number("performance")) {
            let difficulty = concept.get_str("difficulty").unwrap_or(UNKNOWN);
            by_difficulty.entry(difficulty.to_string()).or_default().push(performance);
        }
    }

    Ok(LearningPatterns {
        time_patterns: by_hour.into_iter().map(|(h, v)| (h, mean(&v))).collect(),
        difficulty_patterns: by_difficulty.into_iter().map(|(d, v)| (d, mean(&v))).collect(),
        velocity_patterns: by_domain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeId, PropertyMap};

    /// Activity at `ts` with `performance`, linked to `concept`
    fn activity(store: &mut GraphStore, user: NodeId, key: &str, concept: NodeId, ts: i64, performance: f64) {
        let mut attrs = PropertyMap::new();
        attrs.insert("timestamp".to_string(), PropertyValue::DateTime(ts));
        attrs.insert("performance".to_string(), performance.into());
        let a = store.upsert_vertex(VertexLabel::Activity, key, attrs).unwrap().id;
        store.upsert_edge(EdgeLabel::Performed, user, a, PropertyMap::new()).unwrap();
        store.upsert_edge(EdgeLabel::RelatedTo, a, concept, PropertyMap::new()).unwrap();
    }

    fn concept(store: &mut GraphStore, name: &str, domain: &str, difficulty: &str) -> NodeId {
        let mut attrs = PropertyMap::new();
        attrs.insert("domain".to_string(), domain.into());
        attrs.insert("difficulty".to_string(), difficulty.into());
        store.upsert_vertex(VertexLabel::Concept, name, attrs).unwrap().id
    }

    const HOUR: i64 = 3_600_000;

    #[test]
    fn test_learning_patterns() {
        let mut store = GraphStore::new();
        let user = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let algebra = concept(&mut store, "algebra", "mathematics", "easy");
        let physics = concept(&mut store, "physics", "science", "hard");

        activity(&mut store, user, "u1-1", algebra, 9 * HOUR, 0.8);
        activity(&mut store, user, "u1-2", algebra, 9 * HOUR + 60_000, 0.6);
        activity(&mut store, user, "u1-3", physics, 20 * HOUR, 0.4);

        let patterns = analyze_learning_patterns(&store, "u1").unwrap();
        assert_eq!(patterns.time_patterns.len(), 2);
        assert!((patterns.time_patterns[&9] - 0.7).abs() < 1e-9);
        assert!((patterns.time_patterns[&20] - 0.4).abs() < 1e-9);
        assert!((patterns.difficulty_patterns["easy"] - 0.7).abs() < 1e-9);
        assert_eq!(patterns.velocity_patterns["mathematics"], 2);
        assert_eq!(patterns.velocity_patterns["science"], 1);
    }

    #[test]
    fn test_recommendations_skip_mastered() {
        let mut store = GraphStore::new();
        let user = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let a = concept(&mut store, "a", "general", "easy");
        let b = concept(&mut store, "b", "general", "easy");
        let c = concept(&mut store, "c", "general", "easy");
        let d = concept(&mut store, "d", "general", "easy");
        for m in [a, b] {
            store.upsert_edge(EdgeLabel::Mastered, user, m, PropertyMap::new()).unwrap();
        }
        store.upsert_edge(EdgeLabel::PrerequisiteOf, a, b, PropertyMap::new()).unwrap();
        store.upsert_edge(EdgeLabel::PrerequisiteOf, a, c, PropertyMap::new()).unwrap();
        store.upsert_edge(EdgeLabel::RelatedTo, b, c, PropertyMap::new()).unwrap();
        store.upsert_edge(EdgeLabel::RelatedTo, b, d, PropertyMap::new()).unwrap();

        let recs = get_concept_recommendations(&store, "u1", 5).unwrap();
        assert_eq!(
            recs,
            vec![
                Recommendation { concept: "c".to_string(), score: 2 },
                Recommendation { concept: "d".to_string(), score: 1 },
            ]
        );
        assert_eq!(get_concept_recommendations(&store, "u1", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_knowledge_graph() {
        let mut store = GraphStore::new();
        let user = store.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).unwrap().id;
        let a = concept(&mut store, "a", "general", "easy");
        let b = concept(&mut store, "b", "general", "easy");
        activity(&mut store, user, "u1-1", a, 0, 1.0);
        let mut attrs = PropertyMap::new();
        attrs.insert("mastery".to_string(), 0.3.into());
        store.upsert_edge(EdgeLabel::Studies, user, a, attrs).unwrap();
        let mut strength = PropertyMap::new();
        strength.insert("strength".to_string(), 0.5.into());
        store.upsert_edge(EdgeLabel::PrerequisiteOf, a, b, strength).unwrap();

        let graph = get_user_knowledge_graph(&store, "u1").unwrap();
        assert_eq!(graph.concepts, vec![KnowledgeConcept { name: "a".to_string(), mastery: 0.3 }]);
        assert_eq!(graph.relationships.len(), 1);
        assert_eq!(graph.relationships[0].target, "b");
        assert_eq!(graph.relationships[0].properties["strength"], serde_json::json!(0.5));
    }
}
