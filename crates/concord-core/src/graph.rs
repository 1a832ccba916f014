//! # Graph Engine
//!
//! The in-memory property graph and the statement executor shared by every
//! storage backend.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering.
//! A batch is applied to a working copy and swapped in only once every
//! statement has succeeded, so a failed batch leaves no partial writes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::primitives::{
    AUTHORITY_PROPERTY, HAS_CLASSIFICATION, IDENTIFIER_LABEL, IDENTIFIES, MAX_BATCH_LENGTH,
    SUB_ORGANISATION_OF, THING_LABEL, UUID_PROPERTY, VALUE_PROPERTY,
};
use crate::statement::{ConceptRow, Outcome, Statement, StatementStats};
use crate::types::{ConcordError, Direction, Edge, EdgeId, Node, NodeId, Properties};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait is the only seam between the concept engine and
/// storage.
///
/// All fallible operations return `Result<T, ConcordError>` so in-memory and
/// persistent backends behave uniformly.
pub trait GraphStore {
    /// Execute a batch atomically: either every statement is applied or the
    /// store is left exactly as it was.
    ///
    /// Both bundled backends apply the batch to a clone of the whole graph
    /// and swap it in on success, so a write costs time and memory linear in
    /// the store size, not in the batch size.
    fn execute(&mut self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError>;

    /// Execute a read-only batch. Any mutating statement is rejected.
    fn query(&self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError>;
}

/// Node and edge ids touched by a batch, used by persistent backends to write
/// back only what changed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    pub(crate) nodes: BTreeSet<NodeId>,
    pub(crate) edges: BTreeSet<EdgeId>,
}

/// A borrowed view of one edge as seen from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship<'a> {
    pub rel_type: &'a str,
    /// `uuid` of the node at the other end, if it has one.
    pub neighbour: Option<&'a str>,
    pub platform_version: Option<&'a str>,
    pub properties: &'a Properties,
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The main Graph structure.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node storage: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,

    /// Edge storage: EdgeId -> Edge
    edges: BTreeMap<EdgeId, Edge>,

    /// Adjacency: node -> edges leaving it
    outgoing: BTreeMap<NodeId, BTreeSet<EdgeId>>,

    /// Adjacency: node -> edges entering it
    incoming: BTreeMap<NodeId, BTreeSet<EdgeId>>,

    /// Reverse lookup: uuid -> nodes carrying it. More than one entry is
    /// corruption and is reported, never repaired.
    uuid_index: BTreeMap<String, BTreeSet<NodeId>>,

    /// Reverse lookup: (identifier label, value) -> identifier nodes
    identifier_index: BTreeMap<(String, String), BTreeSet<NodeId>>,

    next_node_id: u64,
    next_edge_id: u64,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over all edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All nodes carrying `uuid`. More than one means the store is corrupt.
    #[must_use]
    pub fn nodes_with_uuid(&self, uuid: &str) -> Vec<&Node> {
        self.ids_for_uuid(uuid)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .collect()
    }

    /// Edges incident on the nodes carrying `uuid`, in one direction.
    #[must_use]
    pub fn relationships(&self, uuid: &str, direction: Direction) -> Vec<Relationship<'_>> {
        let mut out = Vec::new();
        for id in self.ids_for_uuid(uuid) {
            for eid in self.edge_ids(id, direction) {
                let Some(edge) = self.edges.get(&eid) else {
                    continue;
                };
                out.push(Relationship {
                    rel_type: &edge.rel_type,
                    neighbour: self
                        .nodes
                        .get(&edge.far_end(direction))
                        .and_then(Node::uuid),
                    platform_version: edge.platform_version(),
                    properties: &edge.properties,
                });
            }
        }
        out
    }

    /// Uuids of the concepts identified by `(label, value)`.
    #[must_use]
    pub fn identifier_owners(&self, label: &str, value: &str) -> Vec<&str> {
        let key = (label.to_string(), value.to_string());
        let Some(idents) = self.identifier_index.get(&key) else {
            return Vec::new();
        };
        idents
            .iter()
            .flat_map(|ident| self.identified_targets(*ident))
            .filter_map(|target| self.nodes.get(&target).and_then(Node::uuid))
            .collect()
    }

    /// Get the next node ID (for persistence).
    #[must_use]
    pub fn next_node_id(&self) -> u64 {
        self.next_node_id
    }

    /// Get the next edge ID (for persistence).
    #[must_use]
    pub fn next_edge_id(&self) -> u64 {
        self.next_edge_id
    }

    // -------------------------------------------------------------------------
    // Indexing
    // -------------------------------------------------------------------------

    fn index_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if let Some(uuid) = node.uuid() {
            self.uuid_index
                .entry(uuid.to_string())
                .or_default()
                .insert(id);
        }
        for key in identifier_keys(node) {
            self.identifier_index.entry(key).or_default().insert(id);
        }
    }

    fn unindex_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if let Some(uuid) = node.uuid()
            && let Some(set) = self.uuid_index.get_mut(uuid)
        {
            set.remove(&id);
            if set.is_empty() {
                self.uuid_index.remove(uuid);
            }
        }
        for key in identifier_keys(node) {
            if let Some(set) = self.identifier_index.get_mut(&key) {
                set.remove(&id);
                if set.is_empty() {
                    self.identifier_index.remove(&key);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Primitive mutations
    // -------------------------------------------------------------------------

    fn insert_node(
        &mut self,
        labels: BTreeSet<String>,
        properties: Properties,
        journal: &mut Journal,
    ) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                labels,
                properties,
            },
        );
        self.index_node(id);
        journal.nodes.insert(id);
        id
    }

    fn update_node<F: FnOnce(&mut Node)>(&mut self, id: NodeId, journal: &mut Journal, f: F) {
        self.unindex_node(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            f(node);
        }
        self.index_node(id);
        journal.nodes.insert(id);
    }

    /// Remove a node and its adjacency entries. Callers ensure it has no edges.
    fn drop_node(&mut self, id: NodeId, journal: &mut Journal) {
        self.unindex_node(id);
        self.nodes.remove(&id);
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        journal.nodes.insert(id);
    }

    fn insert_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        rel_type: String,
        properties: Properties,
        journal: &mut Journal,
    ) -> EdgeId {
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                from,
                to,
                rel_type,
                properties,
            },
        );
        self.outgoing.entry(from).or_default().insert(id);
        self.incoming.entry(to).or_default().insert(id);
        journal.edges.insert(id);
        id
    }

    fn remove_edge(&mut self, id: EdgeId, journal: &mut Journal) -> bool {
        let Some(edge) = self.edges.remove(&id) else {
            return false;
        };
        if let Some(set) = self.outgoing.get_mut(&edge.from) {
            set.remove(&id);
        }
        if let Some(set) = self.incoming.get_mut(&edge.to) {
            set.remove(&id);
        }
        journal.edges.insert(id);
        true
    }

    fn detach_drop_node(&mut self, id: NodeId, journal: &mut Journal, stats: &mut StatementStats) {
        for eid in self.incident_edges(id) {
            if self.remove_edge(eid, journal) {
                stats.relationships_deleted += 1;
            }
        }
        self.drop_node(id, journal);
        stats.nodes_deleted += 1;
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    fn ids_for_uuid(&self, uuid: &str) -> Vec<NodeId> {
        self.uuid_index
            .get(uuid)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The single node carrying `uuid`, or `InconsistentStore` if several do.
    fn single(&self, uuid: &str) -> Result<Option<NodeId>, ConcordError> {
        let ids = self.ids_for_uuid(uuid);
        match ids.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            _ => Err(ConcordError::InconsistentStore {
                uuid: uuid.to_string(),
                count: ids.len(),
            }),
        }
    }

    /// Find the node for `uuid`, creating a bare `Thing` placeholder if absent.
    fn merge(
        &mut self,
        uuid: &str,
        journal: &mut Journal,
        stats: &mut StatementStats,
    ) -> Result<NodeId, ConcordError> {
        if let Some(id) = self.single(uuid)? {
            return Ok(id);
        }
        let mut properties = Properties::new();
        properties.insert(UUID_PROPERTY.to_string(), uuid.into());
        stats.nodes_created += 1;
        stats.labels_added += 1;
        stats.properties_set += 1;
        Ok(self.insert_node(
            BTreeSet::from([THING_LABEL.to_string()]),
            properties,
            journal,
        ))
    }

    fn edge_ids(&self, node: NodeId, direction: Direction) -> Vec<EdgeId> {
        let adjacency = match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
        };
        adjacency
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn incident_edges(&self, node: NodeId) -> Vec<EdgeId> {
        let mut all: BTreeSet<EdgeId> = self.edge_ids(node, Direction::Outgoing).into_iter().collect();
        all.extend(self.edge_ids(node, Direction::Incoming));
        all.into_iter().collect()
    }

    fn degree(&self, node: NodeId) -> usize {
        self.incident_edges(node).len()
    }

    fn identified_targets(&self, ident: NodeId) -> Vec<NodeId> {
        self.edge_ids(ident, Direction::Outgoing)
            .into_iter()
            .filter_map(|eid| self.edges.get(&eid))
            .filter(|e| e.rel_type == IDENTIFIES)
            .map(|e| e.to)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Statement execution
    // -------------------------------------------------------------------------

    /// Apply a batch in place, recording touched ids. Callers own atomicity.
    pub(crate) fn apply_batch(
        &mut self,
        batch: &[Statement],
        journal: &mut Journal,
    ) -> Result<Vec<Outcome>, ConcordError> {
        if batch.len() > MAX_BATCH_LENGTH {
            return Err(ConcordError::Validation(format!(
                "batch of {} statements exceeds limit of {MAX_BATCH_LENGTH}",
                batch.len()
            )));
        }
        let mut outcomes = Vec::with_capacity(batch.len());
        for statement in batch {
            let outcome = if statement.is_read_only() {
                self.read(statement)?
            } else {
                self.write(statement, journal)?
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn read(&self, statement: &Statement) -> Result<Outcome, ConcordError> {
        match statement {
            Statement::CountNodes { uuid } => Ok(Outcome::Count(self.ids_for_uuid(uuid).len())),
            Statement::CountLabel { label } => Ok(Outcome::Count(
                self.nodes.values().filter(|n| n.has_label(label)).count(),
            )),
            Statement::RelationshipTypes { uuid, direction } => {
                let mut types = BTreeSet::new();
                for id in self.ids_for_uuid(uuid) {
                    for eid in self.edge_ids(id, *direction) {
                        if let Some(edge) = self.edges.get(&eid) {
                            types.insert(edge.rel_type.clone());
                        }
                    }
                }
                Ok(Outcome::RelationshipTypes(types.into_iter().collect()))
            }
            Statement::FetchConcept { uuid } => Ok(Outcome::Concept(self.fetch(uuid)?)),
            Statement::Ping => Ok(Outcome::Pong),
            Statement::ExpectNodeCount { uuid, expected } => {
                let found = self.ids_for_uuid(uuid).len();
                if found != *expected {
                    return Err(ConcordError::Store(format!(
                        "concurrent modification: expected {expected} node(s) for uuid {uuid}, found {found}"
                    )));
                }
                Ok(Outcome::Stats(StatementStats::default()))
            }
            other => Err(ConcordError::Validation(format!(
                "statement '{}' is not read-only",
                other.name()
            ))),
        }
    }

    fn fetch(&self, uuid: &str) -> Result<Option<ConceptRow>, ConcordError> {
        let Some(id) = self.single(uuid)? else {
            return Ok(None);
        };
        let Some(node) = self.nodes.get(&id) else {
            return Ok(None);
        };
        let mut row = ConceptRow {
            node: node.clone(),
            classification: None,
            parent: None,
            identifiers: BTreeMap::new(),
        };

        for eid in self.edge_ids(id, Direction::Outgoing) {
            let Some(edge) = self.edges.get(&eid) else {
                continue;
            };
            let target = self
                .nodes
                .get(&edge.to)
                .and_then(Node::uuid)
                .map(str::to_string);
            match edge.rel_type.as_str() {
                HAS_CLASSIFICATION if row.classification.is_none() => row.classification = target,
                SUB_ORGANISATION_OF if row.parent.is_none() => row.parent = target,
                _ => {}
            }
        }

        for eid in self.edge_ids(id, Direction::Incoming) {
            let Some(edge) = self.edges.get(&eid) else {
                continue;
            };
            if edge.rel_type != IDENTIFIES {
                continue;
            }
            let Some(ident) = self.nodes.get(&edge.from) else {
                continue;
            };
            for (label, value) in identifier_keys(ident) {
                row.identifiers.entry(label).or_default().push(value);
            }
        }
        for values in row.identifiers.values_mut() {
            values.sort();
            values.dedup();
        }
        Ok(Some(row))
    }

    fn write(
        &mut self,
        statement: &Statement,
        journal: &mut Journal,
    ) -> Result<Outcome, ConcordError> {
        let mut stats = StatementStats::default();
        match statement {
            Statement::CreateNode { labels, properties } => {
                let labels: BTreeSet<String> = labels.iter().cloned().collect();
                stats.nodes_created = 1;
                stats.labels_added = labels.len();
                stats.properties_set = properties.len();
                self.insert_node(labels, properties.clone(), journal);
            }
            Statement::CreateEdge {
                from_uuid,
                rel_type,
                to_uuid,
                properties,
            } => {
                if let (Some(from), Some(to)) = (self.single(from_uuid)?, self.single(to_uuid)?) {
                    self.insert_edge(from, to, rel_type.clone(), properties.clone(), journal);
                    stats.relationships_created = 1;
                    stats.properties_set = properties.len();
                }
            }
            Statement::ResetNode {
                uuid,
                remove_labels,
                properties,
            } => {
                let id = self.merge(uuid, journal, &mut stats)?;
                let mut props = properties.clone();
                props.insert(UUID_PROPERTY.to_string(), uuid.as_str().into());
                stats.properties_set += props.len();
                let mut removed = 0;
                self.update_node(id, journal, |node| {
                    for label in remove_labels {
                        if node.labels.remove(label.as_str()) {
                            removed += 1;
                        }
                    }
                    node.labels.insert(THING_LABEL.to_string());
                    node.properties = props;
                });
                stats.labels_removed += removed;
            }
            Statement::AddLabels { uuid, labels } => {
                if let Some(id) = self.single(uuid)? {
                    let mut added = 0;
                    self.update_node(id, journal, |node| {
                        for label in labels {
                            if node.labels.insert(label.clone()) {
                                added += 1;
                            }
                        }
                    });
                    stats.labels_added = added;
                }
            }
            Statement::DeleteManagedEdges { uuid, rel_types } => {
                if let Some(id) = self.single(uuid)? {
                    self.delete_outgoing(id, rel_types, journal, &mut stats);
                }
            }
            Statement::ClearIdentifiers { uuid } => {
                if let Some(id) = self.single(uuid)? {
                    self.clear_identifiers(id, journal, &mut stats);
                }
            }
            Statement::WriteIdentifier {
                uuid,
                label,
                authority,
                value,
                unique,
            } => {
                self.write_identifier(uuid, label, authority, value, *unique, journal, &mut stats)?;
            }
            Statement::MergeEdge {
                from_uuid,
                rel_type,
                to_uuid,
            } => {
                let from = self.merge(from_uuid, journal, &mut stats)?;
                let to = self.merge(to_uuid, journal, &mut stats)?;
                let exists = self
                    .edge_ids(from, Direction::Outgoing)
                    .iter()
                    .filter_map(|eid| self.edges.get(eid))
                    .any(|e| e.to == to && e.rel_type == *rel_type);
                if !exists {
                    self.insert_edge(from, to, rel_type.clone(), Properties::new(), journal);
                    stats.relationships_created += 1;
                }
            }
            Statement::TransferEdges {
                alias_uuid,
                canonical_uuid,
                rel_type,
                direction,
            } => {
                self.transfer(
                    alias_uuid,
                    canonical_uuid,
                    rel_type,
                    *direction,
                    journal,
                    &mut stats,
                )?;
            }
            Statement::DeleteNode { uuid } => {
                for id in self.ids_for_uuid(uuid) {
                    let degree = self.degree(id);
                    if degree > 0 {
                        return Err(ConcordError::Store(format!(
                            "cannot delete node {uuid}: {degree} relationship(s) still attached"
                        )));
                    }
                    self.drop_node(id, journal);
                    stats.nodes_deleted += 1;
                }
            }
            Statement::DetachIdentity {
                uuid,
                required_label,
                remove_labels,
                managed,
            } => {
                let Some(id) = self.single(uuid)? else {
                    return Ok(Outcome::Stats(stats));
                };
                if !self
                    .nodes
                    .get(&id)
                    .is_some_and(|n| n.has_label(required_label))
                {
                    return Ok(Outcome::Stats(stats));
                }
                self.clear_identifiers(id, journal, &mut stats);
                self.delete_outgoing(id, managed, journal, &mut stats);
                let mut removed = 0;
                self.update_node(id, journal, |node| {
                    for label in remove_labels {
                        if node.labels.remove(label.as_str()) {
                            removed += 1;
                        }
                    }
                    node.properties
                        .retain(|key, _| key.as_str() == UUID_PROPERTY);
                });
                stats.labels_removed = removed;
            }
            Statement::DeleteIfOrphan { uuid } => {
                if let Some(id) = self.single(uuid)?
                    && self.degree(id) == 0
                {
                    self.drop_node(id, journal);
                    stats.nodes_deleted = 1;
                }
            }
            read_only => return self.read(read_only),
        }
        Ok(Outcome::Stats(stats))
    }

    fn delete_outgoing(
        &mut self,
        id: NodeId,
        rel_types: &[String],
        journal: &mut Journal,
        stats: &mut StatementStats,
    ) {
        for eid in self.edge_ids(id, Direction::Outgoing) {
            let managed = self
                .edges
                .get(&eid)
                .is_some_and(|e| rel_types.iter().any(|t| *t == e.rel_type));
            if managed && self.remove_edge(eid, journal) {
                stats.relationships_deleted += 1;
            }
        }
    }

    fn clear_identifiers(&mut self, id: NodeId, journal: &mut Journal, stats: &mut StatementStats) {
        for eid in self.edge_ids(id, Direction::Incoming) {
            let source = match self.edges.get(&eid) {
                Some(edge) if edge.rel_type == IDENTIFIES => edge.from,
                _ => continue,
            };
            if self
                .nodes
                .get(&source)
                .is_some_and(|n| n.has_label(IDENTIFIER_LABEL))
            {
                self.detach_drop_node(source, journal, stats);
            }
        }
    }

    fn write_identifier(
        &mut self,
        uuid: &str,
        label: &str,
        authority: &str,
        value: &str,
        unique: bool,
        journal: &mut Journal,
        stats: &mut StatementStats,
    ) -> Result<(), ConcordError> {
        let target = self.merge(uuid, journal, stats)?;
        let key = (label.to_string(), value.to_string());
        let existing: Vec<NodeId> = self
            .identifier_index
            .get(&key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        let mut attached = false;
        for ident in existing {
            for owner in self.identified_targets(ident) {
                if owner == target {
                    attached = true;
                } else if unique {
                    return Err(ConcordError::ConstraintViolation {
                        label: label.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        if attached {
            return Ok(());
        }

        let mut properties = Properties::new();
        properties.insert(VALUE_PROPERTY.to_string(), value.into());
        properties.insert(AUTHORITY_PROPERTY.to_string(), authority.into());
        let labels = BTreeSet::from([IDENTIFIER_LABEL.to_string(), label.to_string()]);
        let ident = self.insert_node(labels, properties, journal);
        self.insert_edge(ident, target, IDENTIFIES.to_string(), Properties::new(), journal);
        stats.nodes_created += 1;
        stats.labels_added += 2;
        stats.properties_set += 2;
        stats.relationships_created += 1;
        Ok(())
    }

    /// Move every `rel_type` edge of `alias` in `direction` onto `canonical`.
    ///
    /// Edges merge on (type, direction, neighbour, platformVersion). A missing
    /// version only matches a missing version. When the canonical edge
    /// already exists it keeps its own properties; the alias edge is deleted
    /// either way.
    fn transfer(
        &mut self,
        alias_uuid: &str,
        canonical_uuid: &str,
        rel_type: &str,
        direction: Direction,
        journal: &mut Journal,
        stats: &mut StatementStats,
    ) -> Result<(), ConcordError> {
        let (Some(alias), Some(canonical)) = (self.single(alias_uuid)?, self.single(canonical_uuid)?)
        else {
            return Ok(());
        };
        if alias == canonical {
            return Ok(());
        }

        for eid in self.edge_ids(alias, direction) {
            let Some(edge) = self.edges.get(&eid).cloned() else {
                continue;
            };
            if edge.rel_type != rel_type {
                continue;
            }
            let mut neighbour = edge.far_end(direction);
            if neighbour == alias {
                neighbour = canonical;
            }
            let version = edge.platform_version();
            let exists = self
                .edge_ids(canonical, direction)
                .iter()
                .filter_map(|id| self.edges.get(id))
                .any(|e| {
                    e.rel_type == rel_type
                        && e.far_end(direction) == neighbour
                        && e.platform_version() == version
                });
            if !exists {
                let (from, to) = match direction {
                    Direction::Outgoing => (canonical, neighbour),
                    Direction::Incoming => (neighbour, canonical),
                };
                self.insert_edge(from, to, edge.rel_type.clone(), edge.properties.clone(), journal);
                stats.relationships_created += 1;
                stats.properties_set += edge.properties.len();
            }
            if self.remove_edge(eid, journal) {
                stats.relationships_deleted += 1;
            }
        }
        Ok(())
    }
}

impl GraphStore for Graph {
    fn execute(&mut self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError> {
        let mut working = self.clone();
        let mut journal = Journal::default();
        let outcomes = working.apply_batch(batch, &mut journal)?;
        *self = working;
        Ok(outcomes)
    }

    fn query(&self, batch: &[Statement]) -> Result<Vec<Outcome>, ConcordError> {
        if batch.len() > MAX_BATCH_LENGTH {
            return Err(ConcordError::Validation(format!(
                "batch of {} statements exceeds limit of {MAX_BATCH_LENGTH}",
                batch.len()
            )));
        }
        batch.iter().map(|s| self.read(s)).collect()
    }
}

/// `(label, value)` keys of an identifier node; empty for any other node.
fn identifier_keys(node: &Node) -> Vec<(String, String)> {
    if !node.has_label(IDENTIFIER_LABEL) {
        return Vec::new();
    }
    let Some(value) = node.text(VALUE_PROPERTY) else {
        return Vec::new();
    };
    node.labels
        .iter()
        .filter(|label| label.as_str() != IDENTIFIER_LABEL)
        .map(|label| (label.clone(), value.to_string()))
        .collect()
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Flat representation of a graph. Indices are rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub next_node_id: u64,
    pub next_edge_id: u64,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes.values().cloned().collect(),
            edges: graph.edges.values().cloned().collect(),
            next_node_id: graph.next_node_id,
            next_edge_id: graph.next_edge_id,
        }
    }
}

impl From<SerializableGraph> for Graph {
    fn from(sg: SerializableGraph) -> Self {
        let mut graph = Graph::new();
        for node in sg.nodes {
            let id = node.id;
            graph.next_node_id = graph.next_node_id.max(id.0 + 1);
            graph.nodes.insert(id, node);
            graph.index_node(id);
        }
        for edge in sg.edges {
            // Dangling edges are dropped.
            if !graph.nodes.contains_key(&edge.from) || !graph.nodes.contains_key(&edge.to) {
                continue;
            }
            graph.next_edge_id = graph.next_edge_id.max(edge.id.0 + 1);
            graph.outgoing.entry(edge.from).or_default().insert(edge.id);
            graph.incoming.entry(edge.to).or_default().insert(edge.id);
            graph.edges.insert(edge.id, edge);
        }
        graph.next_node_id = graph.next_node_id.max(sg.next_node_id);
        graph.next_edge_id = graph.next_edge_id.max(sg.next_edge_id);
        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================
