//! Incremental mastery tracking
//!
//! Mastery of a concept lives on the user's STUDIES edge and is updated by
//! exponential smoothing:
//!
//! ```text
//! mastery' = mastery * retention_weight + performance * performance_weight
//! ```
//!
//! Crossing the threshold for the first time creates a MASTERED edge.

use crate::config::MasteryConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::{
    EdgeLabel, GraphHandle, GraphStore, LockKey, NaturalKey, NodeId, PropertyMap, PropertyValue, VertexLabel,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of one mastery update
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryUpdate {
    pub previous: f64,
    pub mastery: f64,
    /// True only for the update that created the MASTERED edge
    pub just_mastered: bool,
}

/// One study activity reported by an upstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub concept_id: String,
    pub activity_type: String,
    /// Seconds spent
    #[serde(default)]
    pub duration: f64,
    pub performance: f64,
    /// Unix milliseconds, non-negative. Together with the user id it forms
    /// the activity key, so two activities a user reports in the same
    /// millisecond are treated as one and the first wins.
    pub timestamp: i64,
}

/// Result of [`MasteryTracker::track_learning_activity`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOutcome {
    pub activity_id: String,
    pub vertex: NodeId,
    /// False when the activity had already been recorded
    pub created: bool,
    /// Present when this call updated mastery
    pub mastery: Option<MasteryUpdate>,
}

/// The user's STUDIES mastery for a concept, 0 when never studied
pub fn current_mastery(store: &GraphStore, user: NodeId, concept: NodeId) -> f64 {
    store
        .find_edge(EdgeLabel::Studies, user, concept)
        .and_then(|id| store.get_edge(id))
        .and_then(|edge| edge.get_number("mastery"))
        .unwrap_or(0.0)
}

fn validate_performance(performance: f64) -> EngineResult<()> {
    if performance.is_finite() && (0.0..=1.0).contains(&performance) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "performance must be within [0, 1], got {}",
            performance
        )))
    }
}

/// Applies mastery updates through the shared graph handle
#[derive(Debug, Clone)]
pub struct MasteryTracker {
    graph: GraphHandle,
    config: MasteryConfig,
}

impl MasteryTracker {
    pub fn new(graph: GraphHandle, config: MasteryConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &MasteryConfig {
        &self.config
    }

    /// One smoothing step
    pub fn smooth(&self, previous: f64, performance: f64) -> f64 {
        previous * self.config.retention_weight + performance * self.config.performance_weight
    }

    /// Fold one performance sample into the user's mastery of a concept.
    ///
    /// Runs as a single critical section on `(STUDIES, user, concept)`;
    /// concurrent calls for the same pair apply one after another.
    pub async fn record_activity(
        &self,
        user_id: &str,
        concept: &str,
        performance: f64,
        timestamp: i64,
    ) -> EngineResult<MasteryUpdate> {
        validate_performance(performance)?;
        NaturalKey::new(user_id)?;
        NaturalKey::new(concept)?;

        let _guard = self.graph.lock(LockKey::edge(EdgeLabel::Studies, user_id, concept)).await?;
        let mut store = self.graph.write().await?;
        self.apply(&mut store, user_id, concept, performance, timestamp)
    }

    /// Read, smooth and write back under one write guard. Callers hold the
    /// `(STUDIES, user, concept)` key lock.
    fn apply(
        &self,
        store: &mut GraphStore,
        user_id: &str,
        concept: &str,
        performance: f64,
        timestamp: i64,
    ) -> EngineResult<MasteryUpdate> {
        let user = store.get_or_create_vertex(VertexLabel::User, user_id, PropertyMap::new())?.id;
        let concept_id = store.get_or_create_vertex(VertexLabel::Concept, concept, PropertyMap::new())?.id;

        let sessions = store
            .find_edge(EdgeLabel::Studies, user, concept_id)
            .and_then(|id| store.get_edge(id))
            .and_then(|edge| edge.get_property("sessions"))
            .and_then(PropertyValue::as_integer)
            .unwrap_or(0);
        let previous = current_mastery(store, user, concept_id);
        let already_mastered = store.find_edge(EdgeLabel::Mastered, user, concept_id).is_some();

        let mastery = self.smooth(previous, performance);
        let threshold = self.config.threshold;
        let just_mastered = mastery >= threshold && previous < threshold && !already_mastered;

        let mut studies = PropertyMap::new();
        studies.insert("mastery".to_string(), mastery.into());
        studies.insert("lastStudied".to_string(), PropertyValue::DateTime(timestamp));
        studies.insert("sessions".to_string(), (sessions + 1).into());
        store.upsert_edge(EdgeLabel::Studies, user, concept_id, studies)?;

        if just_mastered {
            let mut mastered = PropertyMap::new();
            mastered.insert("achievedAt".to_string(), PropertyValue::DateTime(timestamp));
            mastered.insert("mastery".to_string(), mastery.into());
            store.upsert_edge(EdgeLabel::Mastered, user, concept_id, mastered)?;
            info!(user = user_id, concept, mastery, "concept mastered");
        }

        debug!(user = user_id, concept, previous, mastery, "mastery updated");
        Ok(MasteryUpdate {
            previous,
            mastery,
            just_mastered,
        })
    }

    /// Record an Activity vertex, link it to its user and concept, and update
    /// mastery.
    ///
    /// Activities are keyed by `"{userId}-{timestamp}"`; reporting the same
    /// activity again is a no-op that returns the existing vertex. Both key
    /// locks are taken before anything is written, so a call that fails with
    /// `ConcurrencyConflict` leaves no trace and can be retried.
    pub async fn track_learning_activity(
        &self,
        user_id: &str,
        activity: &ActivityRecord,
    ) -> EngineResult<ActivityOutcome> {
        validate_performance(activity.performance)?;
        if activity.timestamp < 0 {
            return Err(EngineError::Validation(format!(
                "timestamp must be non-negative, got {}",
                activity.timestamp
            )));
        }
        let activity_id = format!("{}-{}", user_id, activity.timestamp);
        NaturalKey::new(user_id)?;
        NaturalKey::new(activity.concept_id.as_str())?;
        NaturalKey::new(activity_id.as_str())?;

        // Lock order: activity, then STUDIES
        let _activity_guard = self
            .graph
            .lock(LockKey::vertex(VertexLabel::Activity, activity_id.as_str()))
            .await?;
        let _studies_guard = self
            .graph
            .lock(LockKey::edge(EdgeLabel::Studies, user_id, activity.concept_id.as_str()))
            .await?;

        let mut store = self.graph.write().await?;
        if let Some(existing) = store.find_vertex(VertexLabel::Activity, &activity_id) {
            debug!(activity = %activity_id, "activity already recorded");
            return Ok(ActivityOutcome {
                activity_id,
                vertex: existing,
                created: false,
                mastery: None,
            });
        }

        let user = store.get_or_create_vertex(VertexLabel::User, user_id, PropertyMap::new())?.id;
        let concept = store
            .get_or_create_vertex(VertexLabel::Concept, &activity.concept_id, PropertyMap::new())?
            .id;

        let mut attrs = PropertyMap::new();
        attrs.insert("type".to_string(), activity.activity_type.as_str().into());
        attrs.insert("duration".to_string(), activity.duration.into());
        attrs.insert("performance".to_string(), activity.performance.into());
        attrs.insert("timestamp".to_string(), PropertyValue::DateTime(activity.timestamp));
        let vertex = store.get_or_create_vertex(VertexLabel::Activity, &activity_id, attrs)?.id;
        store.upsert_edge(EdgeLabel::Performed, user, vertex, PropertyMap::new())?;
        store.upsert_edge(EdgeLabel::RelatedTo, vertex, concept, PropertyMap::new())?;

        let update = self.apply(
            &mut store,
            user_id,
            &activity.concept_id,
            activity.performance,
            activity.timestamp,
        )?;

        Ok(ActivityOutcome {
            activity_id,
            vertex,
            created: true,
            mastery: Some(update),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> MasteryTracker {
        MasteryTracker::new(GraphHandle::open_in_memory(), MasteryConfig::default())
    }

    #[tokio::test]
    async fn test_mastery_sequence() {
        let tracker = tracker();
        let mut seen = Vec::new();
        for ts in 1..=3 {
            seen.push(tracker.record_activity("u1", "algebra", 1.0, ts).await.unwrap());
        }

        let expected = [0.3, 0.51, 0.657];
        for (update, want) in seen.iter().zip(expected) {
            assert!((update.mastery - want).abs() < 1e-6, "{} != {}", update.mastery, want);
            assert!(!update.just_mastered);
        }
        assert_eq!(seen[1].previous, seen[0].mastery);
    }

    #[tokio::test]
    async fn test_mastered_edge_created_once() {
        let tracker = tracker();
        let mut crossings = 0;
        for ts in 0..10 {
            if tracker.record_activity("u1", "algebra", 1.0, ts).await.unwrap().just_mastered {
                crossings += 1;
            }
        }
        assert_eq!(crossings, 1);

        let store = tracker.graph.read().await.unwrap();
        assert_eq!(store.edges_by_label(EdgeLabel::Mastered).count(), 1);
        assert_eq!(store.edges_by_label(EdgeLabel::Studies).count(), 1);

        let studies = store.edges_by_label(EdgeLabel::Studies).next().unwrap();
        assert_eq!(studies.get_property("sessions"), Some(&PropertyValue::Integer(10)));
        assert_eq!(studies.get_property("lastStudied"), Some(&PropertyValue::DateTime(9)));
    }

    #[tokio::test]
    async fn test_mastered_edge_not_recreated_after_dip() {
        let tracker = MasteryTracker::new(
            GraphHandle::open_in_memory(),
            MasteryConfig {
                retention_weight: 0.0,
                performance_weight: 1.0,
                threshold: 0.8,
            },
        );
        assert!(tracker.record_activity("u1", "c", 0.9, 1).await.unwrap().just_mastered);
        assert!(!tracker.record_activity("u1", "c", 0.1, 2).await.unwrap().just_mastered);
        // Crosses again but the edge already exists
        assert!(!tracker.record_activity("u1", "c", 0.9, 3).await.unwrap().just_mastered);
    }

    #[tokio::test]
    async fn test_invalid_performance_rejected() {
        let tracker = tracker();
        for bad in [-0.1, 1.5, f64::NAN] {
            let err = tracker.record_activity("u1", "algebra", bad, 1).await.unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)));
        }
        assert_eq!(tracker.graph.read().await.unwrap().vertex_count(), 0);
    }

    #[tokio::test]
    async fn test_track_activity_is_idempotent() {
        let tracker = tracker();
        let record = ActivityRecord {
            concept_id: "algebra".to_string(),
            activity_type: "quiz".to_string(),
            duration: 120.0,
            performance: 1.0,
            timestamp: 1_700_000_000_000,
        };

        let first = tracker.track_learning_activity("u1", &record).await.unwrap();
        assert!(first.created);
        assert_eq!(first.activity_id, "u1-1700000000000");
        assert!((first.mastery.unwrap().mastery - 0.3).abs() < 1e-9);

        let again = tracker.track_learning_activity("u1", &record).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.vertex, first.vertex);
        assert!(again.mastery.is_none());

        let store = tracker.graph.read().await.unwrap();
        assert_eq!(store.edges_by_label(EdgeLabel::Performed).count(), 1);
        assert_eq!(store.edges_by_label(EdgeLabel::RelatedTo).count(), 1);
        let user = store.find_vertex(VertexLabel::User, "u1").unwrap();
        let concept = store.find_vertex(VertexLabel::Concept, "algebra").unwrap();
        assert!((current_mastery(&store, user, concept) - 0.3).abs() < 1e-9);
    }

    fn quiz(concept: &str, performance: f64, timestamp: i64) -> ActivityRecord {
        ActivityRecord {
            concept_id: concept.to_string(),
            activity_type: "quiz".to_string(),
            duration: 60.0,
            performance,
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_track_activity_retry_after_conflict_applies_mastery() {
        let graph = GraphHandle::open(&crate::config::EngineConfig {
            locking: crate::config::LockConfig {
                acquire_timeout_ms: 20,
                max_retries: 0,
            },
            ..Default::default()
        })
        .await
        .unwrap();
        let tracker = MasteryTracker::new(graph.clone(), MasteryConfig::default());
        let record = quiz("algebra", 1.0, 1_000);

        let held = graph.lock(LockKey::edge(EdgeLabel::Studies, "u1", "algebra")).await.unwrap();
        let err = tracker.track_learning_activity("u1", &record).await.unwrap_err();
        assert!(matches!(err, EngineError::ConcurrencyConflict(_)));
        assert!(err.is_retryable());
        assert_eq!(graph.read().await.unwrap().vertex_count(), 0);
        drop(held);

        let retried = tracker.track_learning_activity("u1", &record).await.unwrap();
        assert!(retried.created);
        assert!((retried.mastery.unwrap().mastery - 0.3).abs() < 1e-9);

        let store = graph.read().await.unwrap();
        let user = store.find_vertex(VertexLabel::User, "u1").unwrap();
        let concept = store.find_vertex(VertexLabel::Concept, "algebra").unwrap();
        assert!((current_mastery(&store, user, concept) - 0.3).abs() < 1e-9);
        assert_eq!(store.edges_by_label(EdgeLabel::Performed).count(), 1);
    }

    #[tokio::test]
    async fn test_negative_timestamp_rejected() {
        let tracker = tracker();
        let err = tracker.track_learning_activity("a", &quiz("algebra", 0.5, -1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // "a" at -1 would otherwise share the key "a--1" with "a-" at 1
        let outcome = tracker.track_learning_activity("a-", &quiz("algebra", 0.5, 1)).await.unwrap();
        assert_eq!(outcome.activity_id, "a--1");
        assert!(outcome.created);
    }

    #[test]
    fn test_activity_record_deserializes_camel_case() {
        let record: ActivityRecord = serde_json::from_value(serde_json::json!({
            "conceptId": "algebra",
            "activityType": "reading",
            "performance": 0.5,
            "timestamp": 42
        }))
        .unwrap();
        assert_eq!(record.concept_id, "algebra");
        assert_eq!(record.duration, 0.0);
    }
}
