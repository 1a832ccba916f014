//! # Core Type Definitions
//!
//! This module contains the structural types of the Concord property graph:
//! - Graph identifiers (`NodeId`, `EdgeId`)
//! - Property values and property maps
//! - Nodes, edges and edge direction
//! - Error types (`ConcordError`)
//!
//! ## Determinism Guarantees
//!
//! All collections in this module are `BTreeMap`/`BTreeSet`, so iteration
//! order (and therefore serialized output) is stable across runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::primitives::{PLATFORM_VERSION_PROPERTY, UUID_PROPERTY};

// =============================================================================
// GRAPH IDENTIFIERS
// =============================================================================

/// Internal identifier of a node in the graph.
///
/// Node ids are allocated by the store and never reused. The public identity
/// of a concept node is its `uuid` property, not this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Internal identifier of an edge in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

// =============================================================================
// PROPERTIES
// =============================================================================

/// A property value stored on a node or an edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Get the value as a string slice, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a list of strings, if it is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Property map of a node or an edge, keyed by property name.
pub type Properties = BTreeMap<String, PropertyValue>;

// =============================================================================
// NODE
// =============================================================================

/// A node in the property graph.
///
/// Concept nodes and placeholders carry a `uuid` property; identifier nodes
/// carry `value` and `authority` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: BTreeSet<String>,
    pub properties: Properties,
}

impl Node {
    /// Create a node with no labels and no properties.
    #[must_use]
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            labels: BTreeSet::new(),
            properties: Properties::new(),
        }
    }

    /// The `uuid` property of this node, if any.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.properties
            .get(UUID_PROPERTY)
            .and_then(PropertyValue::as_text)
    }

    /// Check whether the node carries a label.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Get a text property.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_text)
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub rel_type: String,
    pub properties: Properties,
}

impl Edge {
    /// The `platformVersion` tag of this edge, if it carries one.
    ///
    /// Edges that differ only in this tag are distinct logical generations
    /// and must never be collapsed into each other.
    #[must_use]
    pub fn platform_version(&self) -> Option<&str> {
        self.properties
            .get(PLATFORM_VERSION_PROPERTY)
            .and_then(PropertyValue::as_text)
    }

    /// The endpoint of this edge seen from `node` in the given direction.
    #[must_use]
    pub fn far_end(&self, direction: Direction) -> NodeId {
        match direction {
            Direction::Outgoing => self.to,
            Direction::Incoming => self.from,
        }
    }
}

/// Direction of an edge relative to the node it is looked up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The node is the edge's source.
    Outgoing,
    /// The node is the edge's target.
    Incoming,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outgoing => write!(f, "outgoing"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Concord system.
///
/// - `Validation`: the caller must fix the data; retrying cannot help
/// - `ConstraintViolation`: a unique identifier already belongs to another concept
/// - `InconsistentStore`: pre-existing corruption, surfaced and never auto-healed
/// - `Store`: adapter or transport failure; the whole write may be retried
#[derive(Debug, Error)]
pub enum ConcordError {
    /// The input is invalid (unsupported authority, malformed record, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unique identifier is already attached to another concept.
    #[error("Constraint violation: {label} '{value}' already identifies another concept")]
    ConstraintViolation { label: String, value: String },

    /// More than one node claims the same uuid.
    #[error("Inconsistent store: {count} nodes share uuid {uuid}")]
    InconsistentStore { uuid: String, count: usize },

    /// The graph store failed to execute a batch.
    #[error("Store error: {0}")]
    Store(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ConcordError {
    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
