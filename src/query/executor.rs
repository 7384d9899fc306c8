//! Read-only evaluation of a parsed traversal
//!
//! Every step maps the current traverser set to the next one. The set is
//! materialised between steps and checked against the frontier cap, so a
//! query fans out at most `max_frontier` elements wide.

use crate::config::QueryConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::{Edge, EdgeId, GraphStore, NodeId, PropertyValue, Vertex, VertexLabel};
use crate::query::ast::{Arg, Direction, Source, Step, Traversal};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// What a traverser currently points at
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Vertex(NodeId),
    Edge(EdgeId),
    Value(PropertyValue),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Vertex(u64),
    Edge(u64),
    Value(String),
}

impl Element {
    fn dedup_key(&self) -> DedupKey {
        match self {
            Element::Vertex(id) => DedupKey::Vertex(id.as_u64()),
            Element::Edge(id) => DedupKey::Edge(id.as_u64()),
            Element::Value(v) => DedupKey::Value(format!("{}:{}", v.type_name(), v)),
        }
    }
}

pub struct Executor<'a> {
    store: &'a GraphStore,
    bindings: &'a Map<String, Value>,
    config: &'a QueryConfig,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a GraphStore, bindings: &'a Map<String, Value>, config: &'a QueryConfig) -> Self {
        Self { store, bindings, config }
    }

    /// Run `traversal` and render up to `max_results` elements as JSON
    pub fn execute(&self, traversal: &Traversal) -> EngineResult<Vec<Value>> {
        let mut frontier = self.source(&traversal.source)?;
        self.check_frontier(frontier.len(), "source")?;

        for step in &traversal.steps {
            frontier = self.apply(step, frontier)?;
            self.check_frontier(frontier.len(), step.name())?;
        }

        frontier.truncate(self.config.max_results);
        Ok(frontier.iter().map(|e| self.render(e)).collect())
    }

    fn check_frontier(&self, size: usize, step: &str) -> EngineResult<()> {
        if size > self.config.max_frontier {
            return Err(EngineError::Validation(format!(
                "traversal frontier after {}() exceeds {} elements",
                step, self.config.max_frontier
            )));
        }
        Ok(())
    }

    fn resolve(&self, arg: &Arg) -> EngineResult<PropertyValue> {
        match arg {
            Arg::String(s) => Ok(PropertyValue::String(s.clone())),
            Arg::Integer(i) => Ok(PropertyValue::Integer(*i)),
            Arg::Float(f) => Ok(PropertyValue::Float(*f)),
            Arg::Boolean(b) => Ok(PropertyValue::Boolean(*b)),
            Arg::Binding(name) => {
                let value = self
                    .bindings
                    .get(name)
                    .ok_or_else(|| EngineError::Validation(format!("unbound parameter ${}", name)))?;
                PropertyValue::from_json(value)
                    .ok_or_else(|| EngineError::Validation(format!("parameter ${} must be a scalar", name)))
            }
        }
    }

    fn resolve_str(&self, arg: &Arg, step: &str) -> EngineResult<String> {
        match self.resolve(arg)? {
            PropertyValue::String(s) => Ok(s),
            other => Err(EngineError::Validation(format!(
                "{}() expects a string, got {}",
                step,
                other.type_name()
            ))),
        }
    }

    fn source(&self, source: &Source) -> EngineResult<Vec<Element>> {
        match source {
            Source::Edges => Ok(self.store.all_edges().iter().map(|e| Element::Edge(e.id)).collect()),
            Source::Vertices(args) if args.is_empty() => {
                Ok(self.store.all_vertices().iter().map(|v| Element::Vertex(v.id)).collect())
            }
            Source::Vertices(args) => {
                let mut found = Vec::new();
                for arg in args {
                    match self.resolve(arg)? {
                        PropertyValue::Integer(id) if id >= 0 => {
                            let id = NodeId::new(id as u64);
                            if self.store.has_vertex(id) {
                                found.push(Element::Vertex(id));
                            }
                        }
                        PropertyValue::String(key) => found.extend(
                            VertexLabel::ALL
                                .iter()
                                .filter_map(|&label| self.store.find_vertex(label, &key))
                                .map(Element::Vertex),
                        ),
                        other => {
                            return Err(EngineError::Validation(format!(
                                "V() takes ids or keys, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(found)
            }
        }
    }

    fn apply(&self, step: &Step, frontier: Vec<Element>) -> EngineResult<Vec<Element>> {
        match step {
            Step::HasLabel(label) => {
                let label = self.resolve_str(label, "hasLabel")?;
                Ok(frontier
                    .into_iter()
                    .filter(|e| self.label_of(e).is_some_and(|l| l == label))
                    .collect())
            }
            Step::Has(key, expected) => {
                let key = self.resolve_str(key, "has")?;
                let expected = expected.as_ref().map(|v| self.resolve(v)).transpose()?;
                Ok(frontier
                    .into_iter()
                    .filter(|e| match (self.property_of(e, &key), &expected) {
                        (Some(actual), Some(expected)) => actual.matches(expected),
                        (Some(_), None) => true,
                        (None, _) => false,
                    })
                    .collect())
            }
            Step::Walk(direction, label) => {
                let label = label.as_ref().map(|l| self.resolve_str(l, step.name())).transpose()?;
                let mut next = Vec::new();
                for element in &frontier {
                    let Element::Vertex(id) = element else {
                        return Err(self.expects(step, "vertices"));
                    };
                    let wanted = |edge: &&Edge| label.as_deref().map_or(true, |l| edge.label.as_str() == l);
                    if matches!(direction, Direction::Out | Direction::Both) {
                        next.extend(self.store.outgoing_edges(*id).filter(wanted).map(|e| Element::Vertex(e.target)));
                    }
                    if matches!(direction, Direction::In | Direction::Both) {
                        next.extend(self.store.incoming_edges(*id).filter(wanted).map(|e| Element::Vertex(e.source)));
                    }
                    self.check_frontier(next.len(), step.name())?;
                }
                Ok(next)
            }
            Step::OutV | Step::InV => frontier
                .iter()
                .map(|element| match element {
                    Element::Edge(id) => self
                        .store
                        .get_edge(*id)
                        .map(|e| Element::Vertex(if *step == Step::OutV { e.source } else { e.target }))
                        .ok_or_else(|| EngineError::NotFound(format!("edge {}", id))),
                    _ => Err(self.expects(step, "edges")),
                })
                .collect(),
            Step::Values(key) => {
                let key = self.resolve_str(key, "values")?;
                Ok(frontier
                    .iter()
                    .filter_map(|e| self.property_of(e, &key).cloned())
                    .map(Element::Value)
                    .collect())
            }
            Step::Id => frontier
                .iter()
                .map(|element| match element {
                    Element::Vertex(id) => Ok(Element::Value(PropertyValue::Integer(id.as_u64() as i64))),
                    Element::Edge(id) => Ok(Element::Value(PropertyValue::Integer(id.as_u64() as i64))),
                    Element::Value(_) => Err(self.expects(step, "vertices or edges")),
                })
                .collect(),
            Step::Dedup => {
                let mut unique: IndexMap<DedupKey, Element> = IndexMap::new();
                for element in frontier {
                    unique.entry(element.dedup_key()).or_insert(element);
                }
                Ok(unique.into_values().collect())
            }
            Step::Limit(n) => {
                let n = match self.resolve(n)? {
                    PropertyValue::Integer(n) if n >= 0 => n as usize,
                    other => {
                        return Err(EngineError::Validation(format!(
                            "limit() expects a non-negative integer, got {}",
                            other
                        )))
                    }
                };
                let mut frontier = frontier;
                frontier.truncate(n);
                Ok(frontier)
            }
            Step::Count => Ok(vec![Element::Value(PropertyValue::Integer(frontier.len() as i64))]),
        }
    }

    fn expects(&self, step: &Step, what: &str) -> EngineError {
        EngineError::Validation(format!("{}() can only follow {}", step.name(), what))
    }

    fn vertex(&self, id: NodeId) -> Option<&'a Vertex> {
        self.store.get_vertex(id)
    }

    fn label_of(&self, element: &Element) -> Option<&'static str> {
        match element {
            Element::Vertex(id) => self.vertex(*id).map(|v| v.label.as_str()),
            Element::Edge(id) => self.store.get_edge(*id).map(|e| e.label.as_str()),
            Element::Value(_) => None,
        }
    }

    fn property_of(&self, element: &Element, key: &str) -> Option<&'a PropertyValue> {
        match element {
            Element::Vertex(id) => self.vertex(*id).and_then(|v| v.get_property(key)),
            Element::Edge(id) => self.store.get_edge(*id).and_then(|e| e.get_property(key)),
            Element::Value(_) => None,
        }
    }

    fn render(&self, element: &Element) -> Value {
        match element {
            Element::Vertex(id) => match self.vertex(*id) {
                Some(v) => json!({
                    "id": v.id.as_u64(),
                    "label": v.label.as_str(),
                    "key": v.key.as_str(),
                    "properties": properties_json(v.properties.iter()),
                }),
                None => Value::Null,
            },
            Element::Edge(id) => match self.store.get_edge(*id) {
                Some(e) => json!({
                    "id": e.id.as_u64(),
                    "label": e.label.as_str(),
                    "source": e.source.as_u64(),
                    "target": e.target.as_u64(),
                    "properties": properties_json(e.properties.iter()),
                }),
                None => Value::Null,
            },
            Element::Value(v) => v.to_json(),
        }
    }
}

fn properties_json<'p>(properties: impl Iterator<Item = (&'p String, &'p PropertyValue)>) -> Value {
    Value::Object(properties.map(|(k, v)| (k.clone(), v.to_json())).collect())
}
