//! Persistence for the in-memory graph
//!
//! The graph lives in memory; durability is a point-in-time snapshot written
//! on checkpoint or close and loaded when a handle is opened from it.

pub mod snapshot;

pub use snapshot::{decode, encode, read_file, write_file, SnapshotError, SnapshotResult};
