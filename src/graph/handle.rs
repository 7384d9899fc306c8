//! Shared, lifecycle-managed access to the graph store
//!
//! A [`GraphHandle`] is opened once and cloned into every component. Clones
//! share one store behind a `tokio::sync::RwLock`, one per-key lock table and
//! one open flag; after [`GraphHandle::close`] every call on every clone fails
//! with `UpstreamUnavailable`.

use super::locks::{KeyGuard, KeyLocks, LockKey};
use super::property::PropertyMap;
use super::store::GraphStore;
use super::types::{EdgeId, EdgeLabel, NodeId, Upsert, VertexLabel};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::persistence::{snapshot, SnapshotError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

#[derive(Debug)]
struct HandleInner {
    store: RwLock<GraphStore>,
    locks: KeyLocks,
    open: AtomicBool,
    snapshot_path: Option<PathBuf>,
}

/// Cloneable handle to one graph store
#[derive(Debug, Clone)]
pub struct GraphHandle {
    inner: Arc<HandleInner>,
}

impl GraphHandle {
    fn from_store(store: GraphStore, config: &EngineConfig) -> Self {
        let locks = KeyLocks::new(
            Duration::from_millis(config.locking.acquire_timeout_ms),
            config.locking.max_retries,
        );
        GraphHandle {
            inner: Arc::new(HandleInner {
                store: RwLock::new(store),
                locks,
                open: AtomicBool::new(true),
                snapshot_path: config.snapshot_path.clone(),
            }),
        }
    }

    /// Open a handle for `config`, loading `snapshot_path` when the file exists.
    ///
    /// An inaccessible snapshot path is an error, not an empty graph.
    pub async fn open(config: &EngineConfig) -> EngineResult<Self> {
        if let Some(path) = &config.snapshot_path {
            let exists = tokio::fs::try_exists(path).await.map_err(SnapshotError::Io)?;
            if exists {
                return Self::open_from_snapshot(path, config).await;
            }
        }
        info!("Opened empty graph");
        Ok(Self::from_store(GraphStore::new(), config))
    }

    /// Empty graph with default settings and no snapshot
    pub fn open_in_memory() -> Self {
        Self::from_store(GraphStore::new(), &EngineConfig::default())
    }

    /// Restore the graph from a snapshot file
    pub async fn open_from_snapshot(path: impl AsRef<Path>, config: &EngineConfig) -> EngineResult<Self> {
        let path = path.as_ref();
        let store = snapshot::read_file(path).await?;
        info!(
            path = %path.display(),
            vertices = store.vertex_count(),
            edges = store.edge_count(),
            "Opened graph from snapshot"
        );
        Ok(Self::from_store(store, config))
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(EngineError::UpstreamUnavailable("graph handle is closed".to_string()))
        }
    }

    /// Shared read guard: a consistent point-in-time view
    pub async fn read(&self) -> EngineResult<RwLockReadGuard<'_, GraphStore>> {
        self.ensure_open()?;
        Ok(self.inner.store.read().await)
    }

    /// Exclusive write guard
    pub async fn write(&self) -> EngineResult<RwLockWriteGuard<'_, GraphStore>> {
        self.ensure_open()?;
        Ok(self.inner.store.write().await)
    }

    /// Acquire the per-key lock for a composite read-modify-write
    pub async fn lock(&self, key: LockKey) -> EngineResult<KeyGuard> {
        self.ensure_open()?;
        Ok(self.inner.locks.acquire(key).await?)
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.inner.locks
    }

    /// Find-or-create a vertex, merging attributes into an existing one
    pub async fn upsert_vertex(
        &self,
        label: VertexLabel,
        key: &str,
        properties: PropertyMap,
    ) -> EngineResult<Upsert<NodeId>> {
        let mut store = self.write().await?;
        Ok(store.upsert_vertex(label, key, properties)?)
    }

    /// Find-or-create a singleton edge or append an append-only one.
    ///
    /// Singleton upserts hold the `(label, source key, target key)` lock, so
    /// they never interleave with a read-modify-write on the same edge.
    pub async fn upsert_edge(
        &self,
        label: EdgeLabel,
        source: NodeId,
        target: NodeId,
        properties: PropertyMap,
    ) -> EngineResult<Upsert<EdgeId>> {
        let lock_key = if label.is_singleton() {
            let store = self.read().await?;
            match (store.get_vertex(source), store.get_vertex(target)) {
                (Some(from), Some(to)) => Some(LockKey::edge(label, from.key.as_str(), to.key.as_str())),
                // the store reports the missing endpoint below
                _ => None,
            }
        } else {
            None
        };
        let _guard = match lock_key {
            Some(key) => Some(self.lock(key).await?),
            None => None,
        };

        let mut store = self.write().await?;
        Ok(store.upsert_edge(label, source, target, properties)?)
    }

    /// Write a snapshot of the current state to `path`
    pub async fn checkpoint(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        self.ensure_open()?;
        self.write_snapshot(path.as_ref()).await
    }

    async fn write_snapshot(&self, path: &Path) -> EngineResult<()> {
        let (bytes, vertices, edges) = {
            let store = self.inner.store.read().await;
            (snapshot::encode(&store)?, store.vertex_count(), store.edge_count())
        };
        snapshot::write_file(path, bytes).await?;
        info!(path = %path.display(), vertices, edges, "Wrote graph snapshot");
        Ok(())
    }

    /// Close the handle for every clone, checkpointing first when a
    /// snapshot path is configured. Closing twice is a no-op.
    pub async fn close(&self) -> EngineResult<()> {
        if !self.inner.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        // Writers that already hold the lock finish before the final snapshot
        drop(self.inner.store.write().await);

        if let Some(path) = &self.inner.snapshot_path {
            self.write_snapshot(path).await?;
        }
        info!("Closed graph handle");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_store() {
        let handle = GraphHandle::open_in_memory();
        let other = handle.clone();

        let created = handle.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).await.unwrap();
        let found = other.read().await.unwrap().find_vertex(VertexLabel::User, "u1");
        assert_eq!(found, Some(created.id));
    }

    #[tokio::test]
    async fn test_closed_handle_is_unavailable() {
        let handle = GraphHandle::open_in_memory();
        let other = handle.clone();
        handle.close().await.unwrap();

        assert!(!other.is_open());
        let err = other.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::UpstreamUnavailable(_)));
        assert!(err.is_retryable());
        assert!(other.read().await.is_err());

        // second close is a no-op
        assert!(handle.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_edge_requires_endpoints() {
        let handle = GraphHandle::open_in_memory();
        let u = handle.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).await.unwrap().id;

        let err = handle
            .upsert_edge(EdgeLabel::Studies, u, NodeId::new(77), PropertyMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_singleton_upsert_waits_for_edge_lock() {
        let config = EngineConfig {
            locking: crate::config::LockConfig {
                acquire_timeout_ms: 20,
                max_retries: 0,
            },
            ..EngineConfig::default()
        };
        let handle = GraphHandle::open(&config).await.unwrap();
        let u = handle.upsert_vertex(VertexLabel::User, "u1", PropertyMap::new()).await.unwrap().id;
        let c = handle.upsert_vertex(VertexLabel::Concept, "algebra", PropertyMap::new()).await.unwrap().id;

        let held = handle.lock(LockKey::edge(EdgeLabel::Studies, "u1", "algebra")).await.unwrap();
        let err = handle.upsert_edge(EdgeLabel::Studies, u, c, PropertyMap::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::ConcurrencyConflict(_)));
        assert_eq!(handle.read().await.unwrap().edge_count(), 0);

        // append-only labels take no key lock
        handle.upsert_edge(EdgeLabel::Performed, u, c, PropertyMap::new()).await.unwrap();

        drop(held);
        assert!(handle.upsert_edge(EdgeLabel::Studies, u, c, PropertyMap::new()).await.unwrap().created);
    }

    #[tokio::test]
    async fn test_open_fails_when_snapshot_path_is_inaccessible() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let config = EngineConfig {
            // a path under a regular file cannot be checked at all
            snapshot_path: Some(file.join("graph.snap")),
            ..EngineConfig::default()
        };

        let err = GraphHandle::open(&config).await.unwrap_err();
        assert!(matches!(err, EngineError::Snapshot(SnapshotError::Io(_))));
        assert_eq!(std::fs::read(&file).unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_close_writes_configured_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            snapshot_path: Some(dir.path().join("graph.snap")),
            ..EngineConfig::default()
        };

        let handle = GraphHandle::open(&config).await.unwrap();
        handle.upsert_vertex(VertexLabel::Concept, "algebra", PropertyMap::new()).await.unwrap();
        handle.close().await.unwrap();

        let reopened = GraphHandle::open(&config).await.unwrap();
        let store = reopened.read().await.unwrap();
        assert!(store.find_vertex(VertexLabel::Concept, "algebra").is_some());
    }
}
