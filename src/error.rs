//! Error taxonomy surfaced by the engine API

use crate::config::ConfigError;
use crate::graph::locks::LockContention;
use crate::graph::GraphError;
use crate::persistence::SnapshotError;
use crate::query::ParseError;
use learngraph_algorithms::Interrupted;
use thiserror::Error;

/// Errors returned by engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed label, key, argument or query input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced vertex or edge does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Per-key lock contention that outlasted the retry budget
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Query rejected by the gateway deny-list
    #[error("Unsafe query: {0}")]
    UnsafeQuery(String),

    /// The graph handle is closed or otherwise unreachable
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Traversal cancelled or over its deadline
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl EngineError {
    /// Whether the caller may simply retry the same call
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::ConcurrencyConflict(_) | EngineError::UpstreamUnavailable(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<GraphError> for EngineError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeNotFound(_)
            | GraphError::EdgeNotFound(_)
            | GraphError::InvalidEdgeSource(_)
            | GraphError::InvalidEdgeTarget(_) => EngineError::NotFound(err.to_string()),
            GraphError::InvalidLabel(_) | GraphError::InvalidNaturalKey(_) => {
                EngineError::Validation(err.to_string())
            }
            GraphError::Corrupt(_) => EngineError::Snapshot(SnapshotError::Corrupt(err.to_string())),
        }
    }
}

impl From<Interrupted> for EngineError {
    fn from(err: Interrupted) -> Self {
        EngineError::Cancelled(err.to_string())
    }
}

impl From<LockContention> for EngineError {
    fn from(err: LockContention) -> Self {
        EngineError::ConcurrencyConflict(err.to_string())
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<ParseError> for EngineError {
    fn from(err: ParseError) -> Self {
        EngineError::Validation(err.to_string())
    }
}
