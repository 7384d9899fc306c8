//! Query gateway
//!
//! Raw query text passes a word-level deny-list before it reaches the
//! parser. Accepted queries are parsed into a [`Traversal`] and evaluated
//! read-only against a borrowed store.
//!
//! ```text
//! g.V('u1').out('STUDIES').has('difficulty', $level).values('name')
//! ```

pub mod ast;
pub mod executor;
pub mod parser;

pub use ast::{Arg, Direction, Source, Step, Traversal};
pub use executor::{Element, Executor};
pub use parser::{parse_query, ParseError, ParseResult};

use crate::config::QueryConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::GraphStore;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Words that reject a query wherever they appear, compared case-insensitively
pub const DENY_LIST: &[&str] = &[
    "drop", "system", "addV", "addE", "property", "remove", "delete", "clear", "truncate", "shutdown", "admin",
    "config",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub results: Vec<Value>,
    pub count: usize,
}

/// First deny-listed word in `raw`, if any
pub fn denied_word(raw: &str) -> Option<&'static str> {
    raw.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .find_map(|word| DENY_LIST.iter().copied().find(|denied| denied.eq_ignore_ascii_case(word)))
}

/// Screens, parses and runs traversal queries
#[derive(Debug, Clone, Default)]
pub struct QueryGateway {
    config: QueryConfig,
}

impl QueryGateway {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, store: &GraphStore, raw: &str, bindings: &Map<String, Value>) -> EngineResult<QueryResult> {
        if let Some(word) = denied_word(raw) {
            warn!(word, "query rejected by deny-list");
            return Err(EngineError::UnsafeQuery(format!("query contains forbidden word '{}'", word)));
        }

        let traversal = parse_query(raw)?;
        for name in traversal.bindings() {
            if !bindings.contains_key(name) {
                return Err(EngineError::Validation(format!("unbound parameter ${}", name)));
            }
        }

        let results = Executor::new(store, bindings, &self.config).execute(&traversal)?;
        debug!(steps = traversal.steps.len(), results = results.len(), "query executed");
        Ok(QueryResult {
            count: results.len(),
            results,
        })
    }
}
