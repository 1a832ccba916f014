//! # Identity Vocabulary
//!
//! Maps external identifier authorities to the graph labels their identifier
//! nodes carry, and maps concept types to their label chains.
//!
//! The authority table is data, not code: new authorities are registered
//! through [`AuthorityRegistry::with_authority`] without touching the write
//! or read paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::primitives::{CONCEPT_LABEL, IDENTIFIER_LABEL, THING_LABEL};
use crate::types::ConcordError;

/// Internal UPP authority. Every concept carries its own uuid under it.
pub const UPP_AUTHORITY: &str = "UPP";
pub const FACTSET_AUTHORITY: &str = "Factset";
pub const LEI_AUTHORITY: &str = "LEI";
pub const TME_AUTHORITY: &str = "TME";

pub const UPP_IDENTIFIER_LABEL: &str = "UPPIdentifier";
pub const FACTSET_IDENTIFIER_LABEL: &str = "FactsetIdentifier";
pub const LEI_IDENTIFIER_LABEL: &str = "LegalEntityIdentifier";
pub const TME_IDENTIFIER_LABEL: &str = "TMEIdentifier";

/// Every label a concept write may set. Reset before each write so a type
/// change never leaves a stale label behind. `Thing` is never removed.
pub const IDENTITY_LABELS: [&str; 6] = [
    CONCEPT_LABEL,
    "Organisation",
    "Company",
    "PublicCompany",
    "Role",
    "BoardRole",
];

// =============================================================================
// AUTHORITY REGISTRY
// =============================================================================

/// How one authority's identifiers are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierKind {
    /// Authority name as it appears in records (e.g. `TME`).
    pub authority: String,
    /// Label of identifier nodes for this authority (e.g. `TMEIdentifier`).
    pub label: String,
    /// Whether a value may identify at most one concept.
    pub unique: bool,
}

/// Injectable authority → identifier-label table.
///
/// The mapping is 1:1 in both directions; registering a label twice is a
/// validation error.
#[derive(Debug, Clone)]
pub struct AuthorityRegistry {
    by_authority: BTreeMap<String, IdentifierKind>,
}

impl AuthorityRegistry {
    /// A registry with no authorities at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_authority: BTreeMap::new(),
        }
    }

    /// The standard authority table.
    ///
    /// LEI codes are shared between legal entities, so they are the only
    /// authority without a uniqueness constraint.
    #[must_use]
    pub fn standard() -> Self {
        let mut by_authority = BTreeMap::new();
        for (authority, label, unique) in [
            (UPP_AUTHORITY, UPP_IDENTIFIER_LABEL, true),
            (FACTSET_AUTHORITY, FACTSET_IDENTIFIER_LABEL, true),
            (LEI_AUTHORITY, LEI_IDENTIFIER_LABEL, false),
            (TME_AUTHORITY, TME_IDENTIFIER_LABEL, true),
        ] {
            by_authority.insert(
                authority.to_string(),
                IdentifierKind {
                    authority: authority.to_string(),
                    label: label.to_string(),
                    unique,
                },
            );
        }
        Self { by_authority }
    }

    /// Register an additional authority.
    pub fn with_authority(
        mut self,
        authority: &str,
        label: &str,
        unique: bool,
    ) -> Result<Self, ConcordError> {
        if authority.is_empty() || label.is_empty() {
            return Err(ConcordError::Validation(
                "authority and label must be non-empty".to_string(),
            ));
        }
        if [THING_LABEL, CONCEPT_LABEL, IDENTIFIER_LABEL].contains(&label)
            || IDENTITY_LABELS.contains(&label)
        {
            return Err(ConcordError::Validation(format!(
                "label '{label}' is reserved"
            )));
        }
        if self.by_authority.contains_key(authority) {
            return Err(ConcordError::Validation(format!(
                "authority '{authority}' is already registered"
            )));
        }
        if self.by_label(label).is_some() {
            return Err(ConcordError::Validation(format!(
                "label '{label}' is already registered"
            )));
        }
        self.by_authority.insert(
            authority.to_string(),
            IdentifierKind {
                authority: authority.to_string(),
                label: label.to_string(),
                unique,
            },
        );
        Ok(self)
    }

    /// Resolve an authority, failing with a validation error when unknown.
    pub fn resolve(&self, authority: &str) -> Result<&IdentifierKind, ConcordError> {
        self.by_authority.get(authority).ok_or_else(|| {
            ConcordError::Validation(format!("unsupported identifier authority '{authority}'"))
        })
    }

    /// Reverse lookup used by the read path.
    #[must_use]
    pub fn by_label(&self, label: &str) -> Option<&IdentifierKind> {
        self.by_authority.values().find(|kind| kind.label == label)
    }
}

impl Default for AuthorityRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// CONCEPT TYPES
// =============================================================================

/// The entity families served by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConceptKind {
    Organisation,
    Role,
}

impl ConceptKind {
    /// The label every concept of this kind carries.
    #[must_use]
    pub fn base_label(self) -> &'static str {
        match self {
            Self::Organisation => "Organisation",
            Self::Role => "Role",
        }
    }

    /// Plural path segment used by the HTTP surface.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Organisation => "organisations",
            Self::Role => "roles",
        }
    }
}

impl std::fmt::Display for ConceptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base_label())
    }
}

impl FromStr for ConceptKind {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "organisation" | "organisations" | "org" => Ok(Self::Organisation),
            "role" | "roles" => Ok(Self::Role),
            other => Err(ConcordError::Validation(format!(
                "unknown concept kind '{other}'"
            ))),
        }
    }
}

/// Concrete concept type, stored on the node as the `type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConceptType {
    Organisation,
    Company,
    PublicCompany,
    Role,
    BoardRole,
}

impl ConceptType {
    /// Stored discriminator value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organisation => "Organisation",
            Self::Company => "Company",
            Self::PublicCompany => "PublicCompany",
            Self::Role => "Role",
            Self::BoardRole => "BoardRole",
        }
    }

    /// Labels applied by a write, most specific first.
    #[must_use]
    pub fn label_chain(self) -> &'static [&'static str] {
        match self {
            Self::Organisation => &["Organisation", CONCEPT_LABEL, THING_LABEL],
            Self::Company => &["Company", "Organisation", CONCEPT_LABEL, THING_LABEL],
            Self::PublicCompany => &[
                "PublicCompany",
                "Company",
                "Organisation",
                CONCEPT_LABEL,
                THING_LABEL,
            ],
            Self::Role => &["Role", CONCEPT_LABEL, THING_LABEL],
            Self::BoardRole => &["BoardRole", "Role", CONCEPT_LABEL, THING_LABEL],
        }
    }

    #[must_use]
    pub fn kind(self) -> ConceptKind {
        match self {
            Self::Organisation | Self::Company | Self::PublicCompany => ConceptKind::Organisation,
            Self::Role | Self::BoardRole => ConceptKind::Role,
        }
    }
}

impl FromStr for ConceptType {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Organisation" => Ok(Self::Organisation),
            "Company" => Ok(Self::Company),
            "PublicCompany" => Ok(Self::PublicCompany),
            "Role" => Ok(Self::Role),
            "BoardRole" => Ok(Self::BoardRole),
            other => Err(ConcordError::Validation(format!(
                "unknown concept type '{other}'"
            ))),
        }
    }
}
