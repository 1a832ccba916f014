//! # Concord Service
//!
//! The entry point the app layer talks to: one storage backend plus the
//! authority registry, exposing write, read, delete, count and check.
//!
//! ## Storage Backends
//!
//! - `InMemory`: in-memory `Graph` (fast, volatile unless exported)
//! - `Persistent`: `RedbGraph` for disk-backed ACID storage

use crate::detach::Detacher;
use crate::graph::{Graph, GraphStore};
use crate::identity::{AuthorityRegistry, ConceptKind};
use crate::model::Concept;
use crate::reader::ReadReconstructor;
use crate::statement::{Outcome, Statement};
use crate::storage::RedbGraph;
use crate::types::ConcordError;
use crate::writer::{WriteOrchestrator, WriteSummary};
use std::path::Path;

/// Storage backend of a service.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory graph (fast, volatile).
    InMemory(Graph),
    /// Disk-backed graph using redb (ACID, persistent).
    Persistent(RedbGraph),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(Graph::new())
    }
}

impl StorageBackend {
    /// The committed graph, whichever backend holds it.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        match self {
            Self::InMemory(graph) => graph,
            Self::Persistent(redb) => redb.graph(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Persistent(_) => "redb",
        }
    }
}

impl GraphStore for StorageBackend {
    fn execute(&mut self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError> {
        match self {
            Self::InMemory(graph) => graph.execute(batch),
            Self::Persistent(redb) => redb.execute(batch),
        }
    }

    fn query(&self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError> {
        match self {
            Self::InMemory(graph) => graph.query(batch),
            Self::Persistent(redb) => redb.query(batch),
        }
    }
}

/// Counters reported by the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub organisation_count: usize,
    pub role_count: usize,
}

/// Concept engine bound to one store.
#[derive(Debug, Default)]
pub struct ConcordService {
    backend: StorageBackend,
    registry: AuthorityRegistry,
}

impl ConcordService {
    /// Create a service with in-memory storage and the standard registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service over an existing in-memory graph.
    #[must_use]
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            backend: StorageBackend::InMemory(graph),
            registry: AuthorityRegistry::standard(),
        }
    }

    /// Create a service backed by a redb database at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, ConcordError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbGraph::open(path)?),
            registry: AuthorityRegistry::standard(),
        })
    }

    /// Replace the authority registry.
    #[must_use]
    pub fn with_registry(mut self, registry: AuthorityRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    #[must_use]
    pub fn registry(&self) -> &AuthorityRegistry {
        &self.registry
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        self.backend.graph()
    }

    /// Write a concept, absorbing any alias it names.
    pub fn write(&mut self, concept: &Concept) -> Result<WriteSummary, ConcordError> {
        WriteOrchestrator::new(&self.registry).write(&mut self.backend, concept)
    }

    /// Read a concept. `Ok(None)` is the normal not-found result.
    pub fn read(&self, kind: ConceptKind, uuid: &str) -> Result<Option<Concept>, ConcordError> {
        ReadReconstructor::new(&self.registry).read(&self.backend, kind, uuid)
    }

    /// Delete a concept. Returns whether identity data was removed.
    pub fn delete(&mut self, kind: ConceptKind, uuid: &str) -> Result<bool, ConcordError> {
        Detacher::delete(&mut self.backend, kind, uuid)
    }

    /// Number of concepts of `kind`.
    pub fn count(&self, kind: ConceptKind) -> Result<usize, ConcordError> {
        single(self.backend.query(&[Statement::CountLabel {
            label: kind.base_label().to_string(),
        }])?)?
        .into_count()
    }

    /// Connectivity check. Never mutates.
    pub fn check(&self) -> Result<(), ConcordError> {
        match single(self.backend.query(&[Statement::Ping])?)? {
            Outcome::Pong => Ok(()),
            other => Err(ConcordError::Store(format!(
                "unexpected check result {other:?}"
            ))),
        }
    }

    /// Compact the store file. An in-memory store has nothing to reclaim.
    pub fn compact(&mut self) -> Result<bool, ConcordError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(false),
            StorageBackend::Persistent(redb) => redb.compact(),
        }
    }

    pub fn metrics(&self) -> Result<StoreMetrics, ConcordError> {
        Ok(StoreMetrics {
            node_count: self.graph().node_count(),
            edge_count: self.graph().edge_count(),
            organisation_count: self.count(ConceptKind::Organisation)?,
            role_count: self.count(ConceptKind::Role)?,
        })
    }
}

fn single(outcomes: Vec<Outcome>) -> Result<Outcome, ConcordError> {
    outcomes
        .into_iter()
        .next()
        .ok_or_else(|| ConcordError::Store("empty result".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::model::{AlternativeIdentifiers, Organisation, Role};
    use tempfile::tempdir;

    fn org(uuid: &str) -> Concept {
        Concept::from(Organisation {
            uuid: uuid.to_string(),
            proper_name: "Name".to_string(),
            alternative_identifiers: AlternativeIdentifiers {
                uuids: vec![uuid.to_string()],
                ..AlternativeIdentifiers::default()
            },
            ..Organisation::default()
        })
    }

    #[test]
    fn counts_are_per_kind() {
        let mut service = ConcordService::new();
        service.write(&org("o1")).unwrap();
        service
            .write(&Concept::from(Role {
                uuid: "r1".to_string(),
                ..Role::default()
            }))
            .unwrap();
        assert_eq!(service.count(ConceptKind::Organisation).unwrap(), 1);
        assert_eq!(service.count(ConceptKind::Role).unwrap(), 1);
        service.check().unwrap();
    }

    #[test]
    fn read_is_kind_scoped() {
        let mut service = ConcordService::new();
        service.write(&org("o1")).unwrap();
        assert!(service.read(ConceptKind::Role, "o1").unwrap().is_none());
        assert!(service
            .read(ConceptKind::Organisation, "o1")
            .unwrap()
            .is_some());
    }

    #[test]
    fn persistent_service_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("concord.redb");
        {
            let mut service = ConcordService::with_redb(&path).unwrap();
            assert!(service.is_persistent());
            service.write(&org("o1")).unwrap();
        }
        let service = ConcordService::with_redb(&path).unwrap();
        assert_eq!(
            service.read(ConceptKind::Organisation, "o1").unwrap(),
            Some(org("o1"))
        );
    }

    #[test]
    fn compact_keeps_committed_concepts() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("concord.redb");
        {
            let mut service = ConcordService::with_redb(&path).unwrap();
            for uuid in ["o1", "o2", "o3"] {
                service.write(&org(uuid)).unwrap();
            }
            assert!(service.delete(ConceptKind::Organisation, "o2").unwrap());
            service.compact().unwrap();
            assert_eq!(service.count(ConceptKind::Organisation).unwrap(), 2);
        }
        let service = ConcordService::with_redb(&path).unwrap();
        assert_eq!(service.count(ConceptKind::Organisation).unwrap(), 2);
        assert!(service.read(ConceptKind::Organisation, "o2").unwrap().is_none());
        assert_eq!(
            service.read(ConceptKind::Organisation, "o3").unwrap(),
            Some(org("o3"))
        );
    }

    #[test]
    fn compact_in_memory_is_a_no_op() {
        let mut service = ConcordService::new();
        service.write(&org("o1")).unwrap();
        assert!(!service.compact().unwrap());
        assert_eq!(service.count(ConceptKind::Organisation).unwrap(), 1);
    }
}
