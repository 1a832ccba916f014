//! # Graph Vocabulary and Limits
//!
//! Hardcoded labels, relationship types, property names and input limits.
//!
//! These names are the contract shared with the other writers of the graph
//! (content annotations, classification loaders). Changing any of them is a
//! data migration, not a refactoring.

/// Base label of every concept node and every placeholder.
pub const THING_LABEL: &str = "Thing";

/// Label carried by every fully written concept.
pub const CONCEPT_LABEL: &str = "Concept";

/// Label carried by every identifier node.
pub const IDENTIFIER_LABEL: &str = "Identifier";

/// Edge from an identifier node to the concept it identifies.
pub const IDENTIFIES: &str = "IDENTIFIES";

/// Managed edge from an organisation to its industry classification.
pub const HAS_CLASSIFICATION: &str = "HAS_CLASSIFICATION";

/// Managed edge from an organisation to its parent organisation.
pub const SUB_ORGANISATION_OF: &str = "SUB_ORGANISATION_OF";

/// Edge types owned by the concept write path.
///
/// Every other edge type incident on a concept belongs to another writer.
pub const MANAGED_RELATIONSHIPS: [&str; 2] = [HAS_CLASSIFICATION, SUB_ORGANISATION_OF];

/// Identity property of concept and placeholder nodes.
pub const UUID_PROPERTY: &str = "uuid";

/// Stored type discriminator of a concept node.
pub const TYPE_PROPERTY: &str = "type";

/// Value property of identifier nodes.
pub const VALUE_PROPERTY: &str = "value";

/// Authority property of identifier nodes.
pub const AUTHORITY_PROPERTY: &str = "authority";

/// Edge property segmenting otherwise-identical edges into generations.
pub const PLATFORM_VERSION_PROPERTY: &str = "platformVersion";

/// Magic bytes for the Concord snapshot file header.
pub const MAGIC_BYTES: &[u8; 4] = b"CNCD";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a uuid (or any reference to one).
pub const MAX_UUID_LENGTH: usize = 128;

/// Maximum length of a descriptive text field.
pub const MAX_FIELD_LENGTH: usize = 4096;

/// Maximum number of entries in a list field (aliases, former names, ...).
pub const MAX_LIST_LENGTH: usize = 1000;

/// Maximum number of alternative identifiers on one concept.
pub const MAX_IDENTIFIERS: usize = 1000;

/// Maximum number of statements in a single batch.
///
/// A write touching more aliases than this is rejected before execution.
pub const MAX_BATCH_LENGTH: usize = 20_000;
