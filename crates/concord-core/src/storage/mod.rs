//! Persistent storage backends.

pub mod redb_graph;

pub use redb_graph::RedbGraph;
