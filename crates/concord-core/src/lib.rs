//! # concord-core
//!
//! Entity concordance and relationship-transfer engine over a property graph.
//!
//! Organisations and roles are written as canonical nodes with identifier
//! nodes attached. When a write names another existing node through a UPP
//! identifier, that node is absorbed in the same atomic batch: its managed
//! edges and identifiers are dropped, every other edge is moved onto the
//! canonical node (keyed on `platformVersion`), and the alias is deleted.
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no network dependencies
//! - Every mutation goes through [`GraphStore::execute`] as one batch
//! - Deterministic: `BTreeMap`/`BTreeSet` everywhere

// =============================================================================
// MODULES
// =============================================================================

pub mod concordance;
pub mod detach;
pub mod formats;
pub mod graph;
pub mod identity;
pub mod model;
pub mod primitives;
pub mod reader;
pub mod service;
pub mod statement;
pub mod storage;
pub mod transfer;
pub mod types;
pub mod writer;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use types::{ConcordError, Direction, Edge, EdgeId, Node, NodeId, Properties, PropertyValue};

pub use concordance::ConcordanceResolver;
pub use detach::Detacher;
pub use graph::{Graph, GraphStore, Relationship, SerializableGraph};
pub use identity::{AuthorityRegistry, ConceptKind, ConceptType, IdentifierKind};
pub use model::{AlternativeIdentifiers, Concept, Identifier, OrgType, Organisation, Role};
pub use reader::ReadReconstructor;
pub use service::{ConcordService, StorageBackend, StoreMetrics};
pub use statement::{ConceptRow, Outcome, Statement, StatementStats};
pub use storage::RedbGraph;
pub use transfer::RelationshipTransfer;
pub use writer::{WriteOrchestrator, WritePlan, WriteSummary};

pub use formats::{SnapshotHeader, graph_from_bytes, graph_to_bytes};
