//! Per-key mutual exclusion for composite read-modify-write flows
//!
//! The store's `RwLock` makes single upserts atomic. Flows that read, compute
//! and then write (mastery updates, relationship creation) additionally hold
//! the async mutex for the key they touch, so writers to unrelated keys never
//! wait on each other.

use super::types::{EdgeLabel, VertexLabel};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::warn;

/// Table size above which idle entries are dropped on the next acquire
const PRUNE_THRESHOLD: usize = 1024;

/// Identity of a lockable vertex or edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Vertex(VertexLabel, String),
    Edge(EdgeLabel, String, String),
}

impl LockKey {
    pub fn vertex(label: VertexLabel, key: impl Into<String>) -> Self {
        LockKey::Vertex(label, key.into())
    }

    pub fn edge(label: EdgeLabel, from: impl Into<String>, to: impl Into<String>) -> Self {
        LockKey::Edge(label, from.into(), to.into())
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Vertex(label, key) => write!(f, "{}:{}", label, key),
            LockKey::Edge(label, from, to) => write!(f, "{}:{}->{}", label, from, to),
        }
    }
}

/// Held for the duration of a critical section; released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: LockKey,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn key(&self) -> &LockKey {
        &self.key
    }
}

/// Failure to acquire a key within the configured attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockContention {
    pub key: LockKey,
    pub attempts: u32,
}

impl fmt::Display for LockContention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock on {} not acquired after {} attempts", self.key, self.attempts)
    }
}

impl std::error::Error for LockContention {}

/// Table of async mutexes, one per key in use
#[derive(Debug)]
pub struct KeyLocks {
    table: Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
    acquire_timeout: Duration,
    max_retries: u32,
}

impl KeyLocks {
    pub fn new(acquire_timeout: Duration, max_retries: u32) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            acquire_timeout,
            max_retries,
        }
    }

    fn slot(&self, key: &LockKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table.len() > PRUNE_THRESHOLD {
            // Only the table itself holds idle entries
            table.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        table.entry(key.clone()).or_default().clone()
    }

    /// Acquire `key`, waiting at most `acquire_timeout` per attempt and
    /// making `max_retries + 1` attempts in total.
    pub async fn acquire(&self, key: LockKey) -> Result<KeyGuard, LockContention> {
        let slot = self.slot(&key);
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.acquire_timeout, slot.clone().lock_owned()).await {
                Ok(guard) => return Ok(KeyGuard { key, _guard: guard }),
                Err(_) => {
                    warn!(key = %key, attempt, "timed out waiting for key lock");
                }
            }
        }

        Err(LockContention { key, attempts })
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
