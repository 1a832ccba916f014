//! # Statements
//!
//! The instruction set of the graph store. A write is planned as an ordered
//! list of statements and handed to [`GraphStore::execute`] as one batch; the
//! store applies the whole batch or none of it.
//!
//! Reads (`is_read_only`) may also be sent through [`GraphStore::query`],
//! which refuses anything that mutates.
//!
//! [`GraphStore::execute`]: crate::graph::GraphStore::execute
//! [`GraphStore::query`]: crate::graph::GraphStore::query

use std::collections::BTreeMap;

use crate::types::{ConcordError, Direction, Node, Properties};

/// One instruction against the graph store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    // --- reads -------------------------------------------------------------
    /// Number of nodes whose `uuid` property equals `uuid`.
    CountNodes { uuid: String },
    /// Number of nodes carrying `label`.
    CountLabel { label: String },
    /// Distinct relationship types incident on `uuid` in one direction.
    RelationshipTypes { uuid: String, direction: Direction },
    /// The node, its managed edge targets and its identifiers.
    FetchConcept { uuid: String },
    /// Connectivity probe.
    Ping,

    // --- guards ------------------------------------------------------------
    /// Abort the batch unless exactly `expected` nodes carry `uuid`.
    ///
    /// Protects a plan computed from an earlier read against a concurrent
    /// writer changing the graph in between.
    ExpectNodeCount { uuid: String, expected: usize },

    // --- writes ------------------------------------------------------------
    /// Unconditionally create a node.
    CreateNode {
        labels: Vec<String>,
        properties: Properties,
    },
    /// Create an edge between two existing nodes. No-op when either is absent.
    CreateEdge {
        from_uuid: String,
        rel_type: String,
        to_uuid: String,
        properties: Properties,
    },
    /// Merge the node for `uuid`, strip `remove_labels` and replace all of
    /// its properties.
    ResetNode {
        uuid: String,
        remove_labels: Vec<String>,
        properties: Properties,
    },
    AddLabels { uuid: String, labels: Vec<String> },
    /// Delete outgoing edges of the listed types.
    DeleteManagedEdges { uuid: String, rel_types: Vec<String> },
    /// Delete every identifier node attached to `uuid`.
    ClearIdentifiers { uuid: String },
    /// Attach an identifier node to `uuid`. Fails with a constraint
    /// violation when `unique` and the value identifies another node.
    WriteIdentifier {
        uuid: String,
        label: String,
        authority: String,
        value: String,
        unique: bool,
    },
    /// Merge an edge to `to_uuid`, creating a `Thing` placeholder target when
    /// no node carries that uuid yet.
    MergeEdge {
        from_uuid: String,
        rel_type: String,
        to_uuid: String,
    },
    /// Move every `rel_type` edge in `direction` from alias to canonical.
    TransferEdges {
        alias_uuid: String,
        canonical_uuid: String,
        rel_type: String,
        direction: Direction,
    },
    /// Delete nodes carrying `uuid`. Fails if any edge is still attached.
    DeleteNode { uuid: String },
    /// Strip identity from a node carrying `required_label`: its identifiers,
    /// its outgoing `managed` edges, the `remove_labels` and all properties
    /// other than `uuid`.
    DetachIdentity {
        uuid: String,
        required_label: String,
        remove_labels: Vec<String>,
        managed: Vec<String>,
    },
    /// Delete the node if nothing references it any more.
    DeleteIfOrphan { uuid: String },
}

impl Statement {
    /// Whether this statement leaves the graph untouched.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::CountNodes { .. }
                | Self::CountLabel { .. }
                | Self::RelationshipTypes { .. }
                | Self::FetchConcept { .. }
                | Self::Ping
                | Self::ExpectNodeCount { .. }
        )
    }

    /// Short name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CountNodes { .. } => "count_nodes",
            Self::CountLabel { .. } => "count_label",
            Self::RelationshipTypes { .. } => "relationship_types",
            Self::FetchConcept { .. } => "fetch_concept",
            Self::Ping => "ping",
            Self::ExpectNodeCount { .. } => "expect_node_count",
            Self::CreateNode { .. } => "create_node",
            Self::CreateEdge { .. } => "create_edge",
            Self::ResetNode { .. } => "reset_node",
            Self::AddLabels { .. } => "add_labels",
            Self::DeleteManagedEdges { .. } => "delete_managed_edges",
            Self::ClearIdentifiers { .. } => "clear_identifiers",
            Self::WriteIdentifier { .. } => "write_identifier",
            Self::MergeEdge { .. } => "merge_edge",
            Self::TransferEdges { .. } => "transfer_edges",
            Self::DeleteNode { .. } => "delete_node",
            Self::DetachIdentity { .. } => "detach_identity",
            Self::DeleteIfOrphan { .. } => "delete_if_orphan",
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Mutation counters reported for one statement (or summed over a batch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementStats {
    pub nodes_created: usize,
    pub nodes_deleted: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
    pub labels_added: usize,
    pub labels_removed: usize,
    pub properties_set: usize,
}

impl StatementStats {
    #[must_use]
    pub fn contains_updates(&self) -> bool {
        *self != Self::default()
    }
}

impl std::ops::AddAssign for StatementStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_created += rhs.nodes_created;
        self.nodes_deleted += rhs.nodes_deleted;
        self.relationships_created += rhs.relationships_created;
        self.relationships_deleted += rhs.relationships_deleted;
        self.labels_added += rhs.labels_added;
        self.labels_removed += rhs.labels_removed;
        self.properties_set += rhs.properties_set;
    }
}

/// A node as returned by [`Statement::FetchConcept`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRow {
    pub node: Node,
    pub classification: Option<String>,
    pub parent: Option<String>,
    /// Identifier values keyed by identifier label, each list sorted.
    pub identifiers: BTreeMap<String, Vec<String>>,
}

/// Result of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Count(usize),
    RelationshipTypes(Vec<String>),
    Concept(Option<ConceptRow>),
    Stats(StatementStats),
    Pong,
}

impl Outcome {
    pub fn into_count(self) -> Result<usize, ConcordError> {
        match self {
            Self::Count(n) => Ok(n),
            other => Err(unexpected("count", &other)),
        }
    }

    pub fn into_relationship_types(self) -> Result<Vec<String>, ConcordError> {
        match self {
            Self::RelationshipTypes(types) => Ok(types),
            other => Err(unexpected("relationship types", &other)),
        }
    }

    pub fn into_concept(self) -> Result<Option<ConceptRow>, ConcordError> {
        match self {
            Self::Concept(row) => Ok(row),
            other => Err(unexpected("concept", &other)),
        }
    }

    /// Mutation counters; reads report none.
    #[must_use]
    pub fn stats(&self) -> StatementStats {
        match self {
            Self::Stats(s) => *s,
            _ => StatementStats::default(),
        }
    }
}

fn unexpected(wanted: &str, got: &Outcome) -> ConcordError {
    ConcordError::Store(format!("expected {wanted} outcome, got {got:?}"))
}

/// Sum the mutation counters of a batch.
#[must_use]
pub fn total_stats(outcomes: &[Outcome]) -> StatementStats {
    let mut total = StatementStats::default();
    for outcome in outcomes {
        total += outcome.stats();
    }
    total
}
