//! `LearningGraph`: the operations callers use, in one place
//!
//! Mutations go through the shared [`GraphHandle`]; analytics take a read
//! guard and run against that point-in-time view with a fresh
//! [`Interrupt`](learngraph_algorithms::Interrupt) carrying the configured
//! deadline.

use crate::algo::{
    self, ConceptImportance, KnowledgeGraph, LearnerMatch, LearningCycle, LearningPath, LearningPatterns,
    Recommendation,
};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::graph::{EdgeId, EdgeLabel, GraphHandle, NodeId, PropertyMap, VertexLabel};
use crate::mastery::{ActivityOutcome, ActivityRecord, MasteryTracker, MasteryUpdate};
use crate::ontology::{
    self, BatchConcept, BatchResult, ConceptDefinition, OntologySummary, RelationshipOutcome,
};
use crate::query::{QueryGateway, QueryResult};
use learngraph_algorithms::{PageRankConfig, PathSearchConfig};
use serde_json::{Map, Value};
use std::path::Path;

pub const DEFAULT_RECOMMENDATIONS: usize = 5;
pub const DEFAULT_SIMILAR_LEARNERS: usize = 10;
pub const DEFAULT_RELATIONSHIP_STRENGTH: f64 = 1.0;

/// Learning graph engine
#[derive(Debug, Clone)]
pub struct LearningGraph {
    config: EngineConfig,
    graph: GraphHandle,
    mastery: MasteryTracker,
    gateway: QueryGateway,
}

impl LearningGraph {
    /// Validate `config` and open its graph, restoring the configured
    /// snapshot when one exists.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let graph = GraphHandle::open(&config).await?;
        Ok(Self::with_handle(graph, config))
    }

    pub fn open_in_memory() -> Self {
        Self::with_handle(GraphHandle::open_in_memory(), EngineConfig::default())
    }

    /// Wrap an already opened handle
    pub fn with_handle(graph: GraphHandle, config: EngineConfig) -> Self {
        let mastery = MasteryTracker::new(graph.clone(), config.mastery);
        let gateway = QueryGateway::new(config.query);
        Self {
            config,
            graph,
            mastery,
            gateway,
        }
    }

    pub fn handle(&self) -> &GraphHandle {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn checkpoint(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        self.graph.checkpoint(path).await
    }

    /// Close the underlying handle; every later call fails with
    /// `UpstreamUnavailable`.
    pub async fn close(&self) -> EngineResult<()> {
        self.graph.close().await
    }

    // ---- Mutation API ----

    pub async fn upsert_vertex(&self, label: &str, key: &str, properties: PropertyMap) -> EngineResult<NodeId> {
        let label: VertexLabel = label.parse()?;
        Ok(self.graph.upsert_vertex(label, key, properties).await?.id)
    }

    pub async fn upsert_edge(
        &self,
        label: &str,
        from: NodeId,
        to: NodeId,
        properties: PropertyMap,
    ) -> EngineResult<EdgeId> {
        let label: EdgeLabel = label.parse()?;
        Ok(self.graph.upsert_edge(label, from, to, properties).await?.id)
    }

    pub async fn record_activity(
        &self,
        user_id: &str,
        concept: &str,
        performance: f64,
        timestamp: i64,
    ) -> EngineResult<MasteryUpdate> {
        self.mastery.record_activity(user_id, concept, performance, timestamp).await
    }

    pub async fn track_learning_activity(
        &self,
        user_id: &str,
        activity: &ActivityRecord,
    ) -> EngineResult<ActivityOutcome> {
        self.mastery.track_learning_activity(user_id, activity).await
    }

    pub async fn create_user_profile(
        &self,
        user_id: &str,
        learning_type: &str,
        preferences: &Map<String, Value>,
    ) -> EngineResult<NodeId> {
        ontology::create_user_profile(&self.graph, user_id, learning_type, preferences).await
    }

    /// Link two concepts; `strength` defaults to 1.0
    pub async fn create_concept_relationship(
        &self,
        from: &str,
        to: &str,
        label: &str,
        strength: Option<f64>,
    ) -> EngineResult<RelationshipOutcome> {
        let label: EdgeLabel = label.parse()?;
        let strength = strength.unwrap_or(DEFAULT_RELATIONSHIP_STRENGTH);
        ontology::create_concept_relationship(&self.graph, from, to, label, strength).await
    }

    pub async fn build_domain_ontology(
        &self,
        domain: &str,
        concepts: &[ConceptDefinition],
    ) -> EngineResult<OntologySummary> {
        ontology::build_domain_ontology(&self.graph, domain, concepts).await
    }

    pub async fn batch_create_concepts(&self, concepts: &[BatchConcept]) -> EngineResult<Vec<BatchResult>> {
        ontology::batch_create_concepts(&self.graph, concepts).await
    }

    // ---- Analytics ----

    /// Scored paths between two concepts. `max_paths` and `max_depth` fall
    /// back to the `traversal` section.
    pub async fn find_learning_path(
        &self,
        user_id: &str,
        from: &str,
        to: &str,
        max_paths: Option<usize>,
        max_depth: Option<usize>,
    ) -> EngineResult<Vec<LearningPath>> {
        let search = PathSearchConfig {
            max_depth: max_depth.unwrap_or(self.config.traversal.max_depth),
            max_paths: max_paths.unwrap_or(self.config.traversal.max_paths),
        };
        let store = self.graph.read().await?;
        algo::find_learning_paths(&store, user_id, from, to, &search, &self.config.traversal.interrupt())
    }

    /// PageRank over a domain's concepts, defaults from `ranking`
    pub async fn compute_importance(
        &self,
        domain: &str,
        iterations: Option<usize>,
        damping: Option<f64>,
    ) -> EngineResult<Vec<ConceptImportance>> {
        let ranking = PageRankConfig {
            damping_factor: damping.unwrap_or(self.config.ranking.damping),
            iterations: iterations.unwrap_or(self.config.ranking.iterations),
        };
        let store = self.graph.read().await?;
        algo::compute_importance(&store, domain, ranking, &self.config.traversal.interrupt())
    }

    pub async fn find_communities(&self, user_id: &str, limit: usize) -> EngineResult<Vec<LearnerMatch>> {
        let store = self.graph.read().await?;
        algo::find_communities(&store, user_id, limit, &self.config.traversal.interrupt())
    }

    pub async fn find_similar_learners(&self, user_id: &str, limit: usize) -> EngineResult<Vec<LearnerMatch>> {
        let store = self.graph.read().await?;
        algo::find_similar_learners(&store, user_id, limit, &self.config.traversal.interrupt())
    }

    pub async fn detect_cycles(&self, user_id: &str, limit: usize) -> EngineResult<Vec<LearningCycle>> {
        let store = self.graph.read().await?;
        algo::detect_cycles(
            &store,
            user_id,
            limit,
            self.config.traversal.max_cycle_length,
            &self.config.traversal.interrupt(),
        )
    }

    pub async fn get_user_knowledge_graph(&self, user_id: &str) -> EngineResult<KnowledgeGraph> {
        let store = self.graph.read().await?;
        algo::get_user_knowledge_graph(&store, user_id)
    }

    pub async fn get_concept_recommendations(&self, user_id: &str, limit: usize) -> EngineResult<Vec<Recommendation>> {
        let store = self.graph.read().await?;
        algo::get_concept_recommendations(&store, user_id, limit)
    }

    pub async fn analyze_learning_patterns(&self, user_id: &str) -> EngineResult<LearningPatterns> {
        let store = self.graph.read().await?;
        algo::analyze_learning_patterns(&store, user_id)
    }

    /// Screen and run a read-only traversal query
    pub async fn execute_query(&self, raw: &str, bindings: &Map<String, Value>) -> EngineResult<QueryResult> {
        let store = self.graph.read().await?;
        self.gateway.execute(&store, raw, bindings)
    }
}

impl From<GraphHandle> for LearningGraph {
    fn from(graph: GraphHandle) -> Self {
        Self::with_handle(graph, EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[tokio::test]
    async fn test_string_labels_are_validated() {
        let graph = LearningGraph::open_in_memory();
        let user = graph.upsert_vertex("User", "u1", PropertyMap::new()).await.unwrap();
        let concept = graph.upsert_vertex("Concept", "algebra", PropertyMap::new()).await.unwrap();

        assert!(matches!(
            graph.upsert_vertex("Instructor", "t1", PropertyMap::new()).await,
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            graph.upsert_edge("KNOWS", user, concept, PropertyMap::new()).await,
            Err(EngineError::Validation(_))
        ));

        let first = graph.upsert_edge("STUDIES", user, concept, PropertyMap::new()).await.unwrap();
        let second = graph.upsert_edge("STUDIES", user, concept, PropertyMap::new()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_path_defaults_come_from_config() {
        let graph = LearningGraph::open_in_memory();
        graph.upsert_vertex("User", "u1", PropertyMap::new()).await.unwrap();
        let a = graph.upsert_vertex("Concept", "a", PropertyMap::new()).await.unwrap();
        let b = graph.upsert_vertex("Concept", "b", PropertyMap::new()).await.unwrap();
        graph.upsert_edge("PREREQUISITE_OF", a, b, PropertyMap::new()).await.unwrap();

        let paths = graph.find_learning_path("u1", "a", "b", None, None).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].concepts, vec!["a", "b"]);
        assert!(matches!(
            graph.find_learning_path("u1", "a", "b", Some(0), None).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_path_depth_supplied_by_caller() {
        let graph = LearningGraph::open_in_memory();
        graph.upsert_vertex("User", "u1", PropertyMap::new()).await.unwrap();
        let mut chain = Vec::new();
        for name in ["a", "b", "c", "d"] {
            chain.push(graph.upsert_vertex("Concept", name, PropertyMap::new()).await.unwrap());
        }
        for pair in chain.windows(2) {
            graph.upsert_edge("PREREQUISITE_OF", pair[0], pair[1], PropertyMap::new()).await.unwrap();
        }

        let paths = graph.find_learning_path("u1", "a", "d", None, Some(2)).await.unwrap();
        assert!(paths.is_empty());
        let paths = graph.find_learning_path("u1", "a", "d", None, Some(3)).await.unwrap();
        assert_eq!(paths[0].concepts, vec!["a", "b", "c", "d"]);
        assert!(matches!(
            graph.find_learning_path("u1", "a", "d", None, Some(0)).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_engine_is_unavailable() {
        let graph = LearningGraph::open_in_memory();
        graph.close().await.unwrap();

        assert!(!graph.handle().is_open());
        let err = graph.record_activity("u1", "algebra", 1.0, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::UpstreamUnavailable(_)));
        assert!(err.is_retryable());
        assert!(matches!(
            graph.execute_query("g.V()", &Map::new()).await,
            Err(EngineError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.ranking.damping = 2.0;
        assert!(matches!(LearningGraph::open(config).await, Err(EngineError::Validation(_))));
    }
}
