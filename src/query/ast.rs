//! Syntax tree for the traversal language

use std::fmt;

/// A literal or a `$name` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Resolved against the caller's bindings at execution time
    Binding(String),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::String(s) => write!(f, "'{}'", s),
            Arg::Integer(i) => write!(f, "{}", i),
            Arg::Float(x) => write!(f, "{}", x),
            Arg::Boolean(b) => write!(f, "{}", b),
            Arg::Binding(name) => write!(f, "${}", name),
        }
    }
}

/// Where a traversal starts
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// `g.V(..)`: every vertex when empty, otherwise the listed ids or keys
    Vertices(Vec<Arg>),
    /// `g.E()`
    Edges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    HasLabel(Arg),
    /// `has(k)` tests presence, `has(k, v)` tests equality
    Has(Arg, Option<Arg>),
    /// `out`/`in`/`both` with an optional edge label
    Walk(Direction, Option<Arg>),
    OutV,
    InV,
    Values(Arg),
    Id,
    Dedup,
    Limit(Arg),
    Count,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::HasLabel(_) => "hasLabel",
            Step::Has(..) => "has",
            Step::Walk(Direction::Out, _) => "out",
            Step::Walk(Direction::In, _) => "in",
            Step::Walk(Direction::Both, _) => "both",
            Step::OutV => "outV",
            Step::InV => "inV",
            Step::Values(_) => "values",
            Step::Id => "id",
            Step::Dedup => "dedup",
            Step::Limit(_) => "limit",
            Step::Count => "count",
        }
    }
}

/// A parsed `g.<source>.<step>...` expression
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub source: Source,
    pub steps: Vec<Step>,
}

impl Traversal {
    /// Placeholder names in order of appearance
    pub fn bindings(&self) -> Vec<&str> {
        let source_args = match &self.source {
            Source::Vertices(args) => args.iter().collect::<Vec<_>>(),
            Source::Edges => Vec::new(),
        };
        let step_args = self.steps.iter().flat_map(|step| match step {
            Step::HasLabel(a) | Step::Values(a) | Step::Limit(a) => vec![a],
            Step::Has(k, v) => std::iter::once(k).chain(v.as_ref()).collect(),
            Step::Walk(_, label) => label.iter().collect(),
            Step::OutV | Step::InV | Step::Id | Step::Dedup | Step::Count => Vec::new(),
        });
        source_args
            .into_iter()
            .chain(step_args)
            .filter_map(|arg| match arg {
                Arg::Binding(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}
