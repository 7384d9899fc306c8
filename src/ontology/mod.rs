//! Profiles, concepts, domains and the relationships between them

use crate::error::{EngineError, EngineResult};
use crate::graph::{
    now_millis, EdgeId, EdgeLabel, GraphHandle, GraphStore, LockKey, NaturalKey, NodeId, PropertyMap, PropertyValue,
    VertexLabel,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Concepts written under one write lock by [`batch_create_concepts`]
pub const BATCH_SIZE: usize = 100;

const DOMAIN_KEYWORDS: &[(&str, &str)] = &[
    ("calculus", "mathematics"),
    ("algebra", "mathematics"),
    ("grammar", "english"),
    ("vocabulary", "english"),
    ("physics", "science"),
    ("chemistry", "science"),
    ("history", "social_studies"),
];

/// Guess a concept's domain from keywords in its name
pub fn extract_domain(concept: &str) -> &'static str {
    let lowered = concept.to_lowercase();
    DOMAIN_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, domain)| *domain)
        .unwrap_or("general")
}

/// Concept entry for [`build_domain_ontology`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptDefinition {
    pub name: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub description: String,
    /// Concepts that must be learned before this one
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

/// Concept entry for [`batch_create_concepts`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConcept {
    pub name: String,
    pub domain: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "reason")]
pub enum BatchStatus {
    Created,
    Existing,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub name: String,
    #[serde(flatten)]
    pub status: BatchStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationshipOutcome {
    pub edge: EdgeId,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OntologySummary {
    pub domain: NodeId,
    pub concepts: usize,
    pub prerequisites: usize,
}

/// Attach `concept` to the named domain, creating the Domain vertex if needed
fn attach_to_domain(store: &mut GraphStore, concept: NodeId, domain: &str) -> EngineResult<()> {
    let domain = store.get_or_create_vertex(VertexLabel::Domain, domain, PropertyMap::new())?.id;
    store.upsert_edge(EdgeLabel::BelongsTo, concept, domain, PropertyMap::new())?;
    Ok(())
}

/// Find-or-create a concept; new concepts get a keyword-derived domain
fn ensure_concept(store: &mut GraphStore, name: &str) -> EngineResult<NodeId> {
    let domain = extract_domain(name);
    let mut attrs = PropertyMap::new();
    attrs.insert("domain".to_string(), domain.into());

    let concept = store.get_or_create_vertex(VertexLabel::Concept, name, attrs)?;
    if concept.created {
        attach_to_domain(store, concept.id, domain)?;
    }
    Ok(concept.id)
}

/// Create or update a learner profile
pub async fn create_user_profile(
    graph: &GraphHandle,
    user_id: &str,
    learning_type: &str,
    preferences: &serde_json::Map<String, serde_json::Value>,
) -> EngineResult<NodeId> {
    let mut attrs = PropertyMap::new();
    for (key, value) in preferences {
        let value = PropertyValue::from_json(value).ok_or_else(|| {
            EngineError::Validation(format!("preference {:?} must be a scalar value", key))
        })?;
        attrs.insert(key.clone(), value);
    }
    // Fixed attributes win over same-named preferences
    attrs.insert("learningType".to_string(), learning_type.into());

    let upsert = graph.upsert_vertex(VertexLabel::User, user_id, attrs).await?;
    debug!(user = user_id, created = upsert.created, "user profile saved");
    Ok(upsert.id)
}

/// Find-or-create a concept-to-concept relationship and set its strength.
///
/// Only PREREQUISITE_OF and RELATED_TO relate concepts. The edge is
/// deduplicated for both labels, so repeating the call updates `strength`.
pub async fn create_concept_relationship(
    graph: &GraphHandle,
    from: &str,
    to: &str,
    label: EdgeLabel,
    strength: f64,
) -> EngineResult<RelationshipOutcome> {
    if !matches!(label, EdgeLabel::PrerequisiteOf | EdgeLabel::RelatedTo) {
        return Err(EngineError::Validation(format!("{} does not relate two concepts", label)));
    }
    if !strength.is_finite() {
        return Err(EngineError::Validation(format!("strength must be finite, got {}", strength)));
    }
    if from == to {
        return Err(EngineError::Validation(format!("concept {:?} cannot relate to itself", from)));
    }

    let _guard = graph.lock(LockKey::edge(label, from, to)).await?;
    let mut store = graph.write().await?;

    let source = ensure_concept(&mut store, from)?;
    let target = ensure_concept(&mut store, to)?;

    let mut attrs = PropertyMap::new();
    attrs.insert("strength".to_string(), strength.into());
    attrs.insert("updatedAt".to_string(), PropertyValue::DateTime(now_millis()));
    let edge = store.find_or_create_edge(label, source, target, attrs)?;

    debug!(from, to, %label, created = edge.created, "concept relationship saved");
    Ok(RelationshipOutcome {
        edge: edge.id,
        created: edge.created,
    })
}

/// Create a domain with its concepts and their prerequisite edges.
///
/// Concepts that already exist keep their attributes and are attached to the
/// domain. All concepts are written before any prerequisite, so a
/// prerequisite defined later in the list still picks up its definition.
pub async fn build_domain_ontology(
    graph: &GraphHandle,
    domain: &str,
    concepts: &[ConceptDefinition],
) -> EngineResult<OntologySummary> {
    let domain_id = {
        let mut store = graph.write().await?;
        let domain_id = store.get_or_create_vertex(VertexLabel::Domain, domain, PropertyMap::new())?.id;

        for concept in concepts {
            let mut attrs = PropertyMap::new();
            attrs.insert("difficulty".to_string(), concept.difficulty.as_str().into());
            attrs.insert("description".to_string(), concept.description.as_str().into());
            attrs.insert("domain".to_string(), domain.into());
            let id = store.get_or_create_vertex(VertexLabel::Concept, &concept.name, attrs)?.id;
            store.upsert_edge(EdgeLabel::BelongsTo, id, domain_id, PropertyMap::new())?;
        }
        domain_id
    };

    let mut prerequisites = 0;
    for concept in concepts {
        for prerequisite in &concept.prerequisites {
            create_concept_relationship(graph, prerequisite, &concept.name, EdgeLabel::PrerequisiteOf, 1.0).await?;
            prerequisites += 1;
        }
    }

    info!(domain, concepts = concepts.len(), prerequisites, "domain ontology built");
    Ok(OntologySummary {
        domain: domain_id,
        concepts: concepts.len(),
        prerequisites,
    })
}

/// Create many concepts, [`BATCH_SIZE`] per write lock.
///
/// One bad entry does not fail the batch; it is reported as `Invalid`.
pub async fn batch_create_concepts(graph: &GraphHandle, concepts: &[BatchConcept]) -> EngineResult<Vec<BatchResult>> {
    let mut results = Vec::with_capacity(concepts.len());

    for batch in concepts.chunks(BATCH_SIZE) {
        let mut store = graph.write().await?;
        for concept in batch {
            // Both keys are checked first so a rejected entry writes nothing
            let keys = NaturalKey::new(concept.name.as_str()).and_then(|_| NaturalKey::new(concept.domain.as_str()));
            if let Err(e) = keys {
                results.push(BatchResult {
                    name: concept.name.clone(),
                    status: BatchStatus::Invalid(e.to_string()),
                });
                continue;
            }

            let mut attrs = PropertyMap::new();
            attrs.insert("domain".to_string(), concept.domain.as_str().into());
            attrs.insert("difficulty".to_string(), concept.difficulty.as_str().into());

            let status = match store.get_or_create_vertex(VertexLabel::Concept, &concept.name, attrs) {
                Ok(upsert) if upsert.created => match attach_to_domain(&mut store, upsert.id, &concept.domain) {
                    Ok(()) => BatchStatus::Created,
                    Err(e) => BatchStatus::Invalid(e.to_string()),
                },
                Ok(_) => BatchStatus::Existing,
                Err(e) => BatchStatus::Invalid(e.to_string()),
            };
            results.push(BatchResult {
                name: concept.name.clone(),
                status,
            });
        }
    }

    debug!(total = results.len(), "batch concept creation finished");
    Ok(results)
}
