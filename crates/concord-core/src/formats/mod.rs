//! Serialization formats.

pub mod persistence;

pub use persistence::{MAX_SNAPSHOT_SIZE, SnapshotHeader, graph_from_bytes, graph_to_bytes};
