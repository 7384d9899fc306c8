//! Engine configuration
//!
//! Every section has defaults, so an empty YAML document is a valid config:
//!
//! ```yaml
//! mastery:
//!   retention_weight: 0.7
//!   performance_weight: 0.3
//!   threshold: 0.8
//! traversal:
//!   max_depth: 6
//!   timeout_ms: 5000
//! snapshot_path: /var/lib/learngraph/graph.snap
//! ```

use learngraph_algorithms::Interrupt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Mastery smoothing and promotion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MasteryConfig {
    /// Weight of the previous mastery value
    pub retention_weight: f64,
    /// Weight of the new performance sample
    pub performance_weight: f64,
    /// Mastery at or above which a MASTERED edge is created
    pub threshold: f64,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            retention_weight: 0.7,
            performance_weight: 0.3,
            threshold: 0.8,
        }
    }
}

/// Bounds for path and cycle searches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TraversalConfig {
    pub max_paths: usize,
    /// Maximum hops in a learning path
    pub max_depth: usize,
    /// Longest cycle reported, in edges
    pub max_cycle_length: usize,
    /// Deadline for a single analytical call; `None` disables it
    pub timeout_ms: Option<u64>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_paths: 5,
            max_depth: 6,
            max_cycle_length: 8,
            timeout_ms: Some(5000),
        }
    }
}

impl TraversalConfig {
    /// Fresh interrupt carrying the configured deadline
    pub fn interrupt(&self) -> Interrupt {
        match self.timeout_ms {
            Some(ms) => Interrupt::with_timeout(Duration::from_millis(ms)),
            None => Interrupt::new(),
        }
    }
}

/// Concept-importance defaults
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    pub iterations: usize,
    pub damping: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            damping: 0.85,
        }
    }
}

/// Per-key lock acquisition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LockConfig {
    pub acquire_timeout_ms: u64,
    /// Extra attempts after the first timeout
    pub max_retries: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 2000,
            max_retries: 3,
        }
    }
}

/// Query gateway caps
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Largest intermediate traverser set
    pub max_frontier: usize,
    pub max_results: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_frontier: 100_000,
            max_results: 1000,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub mastery: MasteryConfig,
    pub traversal: TraversalConfig,
    pub ranking: RankingConfig,
    pub locking: LockConfig,
    pub query: QueryConfig,
    /// Snapshot written on close and read by `open_from_snapshot`
    pub snapshot_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check ranges that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        let m = &self.mastery;
        for (name, w) in [("retention_weight", m.retention_weight), ("performance_weight", m.performance_weight)] {
            if !(0.0..=1.0).contains(&w) {
                return Err(ConfigError::Invalid(format!("mastery.{} must be within [0, 1], got {}", name, w)));
            }
        }
        if m.retention_weight + m.performance_weight > 1.0 + 1e-9 {
            return Err(ConfigError::Invalid("mastery weights must sum to at most 1".to_string()));
        }
        if !(m.threshold > 0.0 && m.threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!("mastery.threshold must be within (0, 1], got {}", m.threshold)));
        }

        if !(0.0..=1.0).contains(&self.ranking.damping) {
            return Err(ConfigError::Invalid(format!(
                "ranking.damping must be within [0, 1], got {}",
                self.ranking.damping
            )));
        }

        let caps = [
            ("traversal.max_paths", self.traversal.max_paths),
            ("traversal.max_depth", self.traversal.max_depth),
            ("traversal.max_cycle_length", self.traversal.max_cycle_length),
            ("query.max_frontier", self.query.max_frontier),
            ("query.max_results", self.query.max_results),
        ];
        if let Some((name, _)) = caps.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{} must be positive", name)));
        }
        if self.locking.acquire_timeout_ms == 0 {
            return Err(ConfigError::Invalid("locking.acquire_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}
