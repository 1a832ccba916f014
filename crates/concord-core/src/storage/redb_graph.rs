//! # redb-backed Graph Storage
//!
//! A disk-backed graph store using the redb embedded database.
//!
//! The whole graph is mirrored in memory and every statement runs against
//! the mirror. A batch is applied to a copy of the mirror; the nodes and
//! edges it touched are then written in a single redb write transaction, and
//! the copy replaces the mirror only after that transaction commits. A
//! failed statement or a failed commit therefore leaves both the file and
//! the mirror unchanged.

use crate::graph::{Graph, GraphStore, Journal, SerializableGraph};
use crate::statement::{Outcome, Statement};
use crate::types::{ConcordError, Edge, Node};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for nodes: NodeId(u64) -> serialized Node bytes
const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");

/// Table for edges: EdgeId(u64) -> serialized Edge bytes
const EDGES: TableDefinition<u64, &[u8]> = TableDefinition::new("edges");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn store_err(e: impl std::fmt::Display) -> ConcordError {
    ConcordError::Store(e.to_string())
}

/// A disk-backed graph store using redb.
pub struct RedbGraph {
    /// The redb database handle.
    db: Database,
    /// In-memory mirror of the committed graph.
    mirror: Graph,
}

impl std::fmt::Debug for RedbGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbGraph")
            .field("nodes", &self.mirror.node_count())
            .field("edges", &self.mirror.edge_count())
            .finish_non_exhaustive()
    }
}

impl RedbGraph {
    /// Open or create a graph database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConcordError> {
        let db = Database::create(path.as_ref()).map_err(store_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(store_err)?;
            let _ = write_txn.open_table(NODES).map_err(store_err)?;
            let _ = write_txn.open_table(EDGES).map_err(store_err)?;
            let _ = write_txn.open_table(METADATA).map_err(store_err)?;
            write_txn.commit().map_err(store_err)?;
        }

        let read_txn = db.begin_read().map_err(store_err)?;
        let mut sg = SerializableGraph::default();
        {
            let table = read_txn.open_table(METADATA).map_err(store_err)?;
            sg.next_node_id = table
                .get("next_node_id")
                .map_err(store_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            sg.next_edge_id = table
                .get("next_edge_id")
                .map_err(store_err)?
                .map(|v| v.value())
                .unwrap_or(0);
        }
        {
            let table = read_txn.open_table(NODES).map_err(store_err)?;
            for entry in table.iter().map_err(store_err)? {
                let (_, value) = entry.map_err(store_err)?;
                let node: Node = postcard::from_bytes(value.value())
                    .map_err(|e| ConcordError::Serialization(e.to_string()))?;
                sg.nodes.push(node);
            }
        }
        {
            let table = read_txn.open_table(EDGES).map_err(store_err)?;
            for entry in table.iter().map_err(store_err)? {
                let (_, value) = entry.map_err(store_err)?;
                let edge: Edge = postcard::from_bytes(value.value())
                    .map_err(|e| ConcordError::Serialization(e.to_string()))?;
                sg.edges.push(edge);
            }
        }

        let mirror = Graph::from(sg);
        tracing::debug!(
            nodes = mirror.node_count(),
            edges = mirror.edge_count(),
            "opened redb graph"
        );
        Ok(Self { db, mirror })
    }

    /// The committed graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.mirror
    }

    /// Compact the database file. Returns whether any space was reclaimed.
    pub fn compact(&mut self) -> Result<bool, ConcordError> {
        self.db.compact().map_err(store_err)
    }

    /// Write the journalled part of `working` in one transaction.
    fn persist(&self, working: &Graph, journal: &Journal) -> Result<(), ConcordError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut nodes = write_txn.open_table(NODES).map_err(store_err)?;
            for id in &journal.nodes {
                match working.node(*id) {
                    Some(node) => {
                        let bytes = postcard::to_allocvec(node)
                            .map_err(|e| ConcordError::Serialization(e.to_string()))?;
                        nodes.insert(id.0, bytes.as_slice()).map_err(store_err)?;
                    }
                    None => {
                        nodes.remove(id.0).map_err(store_err)?;
                    }
                }
            }
        }
        {
            let mut edges = write_txn.open_table(EDGES).map_err(store_err)?;
            for id in &journal.edges {
                match working.edge(*id) {
                    Some(edge) => {
                        let bytes = postcard::to_allocvec(edge)
                            .map_err(|e| ConcordError::Serialization(e.to_string()))?;
                        edges.insert(id.0, bytes.as_slice()).map_err(store_err)?;
                    }
                    None => {
                        edges.remove(id.0).map_err(store_err)?;
                    }
                }
            }
        }
        {
            let mut meta = write_txn.open_table(METADATA).map_err(store_err)?;
            meta.insert("next_node_id", working.next_node_id())
                .map_err(store_err)?;
            meta.insert("next_edge_id", working.next_edge_id())
                .map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;
        Ok(())
    }
}

impl GraphStore for RedbGraph {
    fn execute(&mut self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError> {
        let mut working = self.mirror.clone();
        let mut journal = Journal::default();
        let outcomes = working.apply_batch(batch, &mut journal)?;
        if !journal.nodes.is_empty() || !journal.edges.is_empty() {
            self.persist(&working, &journal)?;
        }
        // Update in-memory state only after successful commit.
        self.mirror = working;
        Ok(outcomes)
    }

    fn query(&self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError> {
        self.mirror.query(batch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::primitives::{THING_LABEL, UUID_PROPERTY};
    use crate::types::Properties;
    use tempfile::tempdir;

    fn thing(uuid: &str) -> Statement {
        let mut properties = Properties::new();
        properties.insert(UUID_PROPERTY.to_string(), uuid.into());
        Statement::CreateNode {
            labels: vec![THING_LABEL.to_string()],
            properties,
        }
    }

    #[test]
    fn writes_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        {
            let mut graph = RedbGraph::open(&db_path).expect("open db");
            graph
                .execute(&[
                    thing("a"),
                    Statement::MergeEdge {
                        from_uuid: "a".into(),
                        rel_type: "SUB_ORGANISATION_OF".into(),
                        to_uuid: "b".into(),
                    },
                ])
                .expect("execute");
        }

        let graph = RedbGraph::open(&db_path).expect("reopen db");
        assert_eq!(graph.graph().node_count(), 2);
        assert_eq!(graph.graph().edge_count(), 1);
        assert_eq!(graph.graph().nodes_with_uuid("b").len(), 1);
    }

    #[test]
    fn deletions_are_persisted() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        {
            let mut graph = RedbGraph::open(&db_path).expect("open db");
            graph.execute(&[thing("a"), thing("b")]).expect("create");
            graph
                .execute(&[Statement::DeleteNode { uuid: "a".into() }])
                .expect("delete");
        }
        let graph = RedbGraph::open(&db_path).expect("reopen db");
        assert_eq!(graph.graph().node_count(), 1);
        assert!(graph.graph().nodes_with_uuid("a").is_empty());
    }

    #[test]
    fn failed_batch_writes_nothing() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        {
            let mut graph = RedbGraph::open(&db_path).expect("open db");
            let result = graph.execute(&[
                thing("a"),
                Statement::ExpectNodeCount {
                    uuid: "a".into(),
                    expected: 0,
                },
            ]);
            assert!(result.is_err());
            assert_eq!(graph.graph().node_count(), 0);
        }
        let graph = RedbGraph::open(&db_path).expect("reopen db");
        assert_eq!(graph.graph().node_count(), 0);
    }

    #[test]
    fn ids_keep_increasing_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        {
            let mut graph = RedbGraph::open(&db_path).expect("open db");
            graph.execute(&[thing("a")]).expect("create");
            graph
                .execute(&[Statement::DeleteNode { uuid: "a".into() }])
                .expect("delete");
        }
        let mut graph = RedbGraph::open(&db_path).expect("reopen db");
        graph.execute(&[thing("b")]).expect("create");
        assert_eq!(graph.graph().nodes_with_uuid("b")[0].id.0, 1);
    }
}
