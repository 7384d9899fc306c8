//! Compressed graph snapshots
//!
//! Layout: 8-byte magic, then a gzip stream holding a bincode-encoded
//! [`SnapshotData`]. Snapshots hold the full arenas; indexes are rebuilt on
//! load by [`GraphStore::restore`].

use crate::graph::{Edge, GraphStore, Vertex};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8; 8] = b"LGSNAP01";

/// Snapshot errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Not a graph snapshot")]
    BadMagic,

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotData {
    created_at: i64,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    created_at: i64,
    vertices: &'a [Vertex],
    edges: &'a [Edge],
}

/// Encode the whole store
pub fn encode(store: &GraphStore) -> SnapshotResult<Vec<u8>> {
    let data = SnapshotRef {
        created_at: crate::graph::now_millis(),
        vertices: store.all_vertices(),
        edges: store.all_edges(),
    };

    let mut out = Vec::with_capacity(MAGIC.len() + 1024);
    out.extend_from_slice(MAGIC);
    let mut encoder = GzEncoder::new(out, Compression::default());
    bincode::serialize_into(&mut encoder, &data)?;
    Ok(encoder.finish()?)
}

/// Decode a snapshot and rebuild the store
pub fn decode(bytes: &[u8]) -> SnapshotResult<GraphStore> {
    let body = bytes.strip_prefix(MAGIC.as_slice()).ok_or(SnapshotError::BadMagic)?;

    let mut raw = Vec::new();
    GzDecoder::new(body).read_to_end(&mut raw)?;
    let data: SnapshotData = bincode::deserialize(&raw)?;

    GraphStore::restore(data.vertices, data.edges).map_err(|e| SnapshotError::Corrupt(e.to_string()))
}

/// Write encoded bytes to a temporary sibling, then rename it over `path`.
pub async fn write_file(path: &Path, bytes: Vec<u8>) -> SnapshotResult<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read and decode a snapshot file
pub async fn read_file(path: &Path) -> SnapshotResult<GraphStore> {
    let bytes = tokio::fs::read(path).await?;
    decode(&bytes)
}
