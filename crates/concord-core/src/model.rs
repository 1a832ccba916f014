//! # Concept Records
//!
//! The denormalised records exchanged with callers: organisations and roles,
//! plus their alternative identifiers. Field names follow the camelCase
//! document format used by the HTTP surface and by the CLI's JSON files.

use serde::{Deserialize, Serialize};

use crate::identity::{
    ConceptKind, ConceptType, FACTSET_AUTHORITY, LEI_AUTHORITY, TME_AUTHORITY, UPP_AUTHORITY,
};
use crate::primitives::{
    HAS_CLASSIFICATION, MAX_FIELD_LENGTH, MAX_IDENTIFIERS, MAX_LIST_LENGTH, MAX_UUID_LENGTH,
    SUB_ORGANISATION_OF, TYPE_PROPERTY, UUID_PROPERTY,
};
use crate::types::{ConcordError, Properties, PropertyValue};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// One `(authority, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub authority: String,
    #[serde(rename = "identifierValue")]
    pub value: String,
}

impl Identifier {
    pub fn new(authority: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            value: value.into(),
        }
    }
}

/// Alternative identifiers of a concept, bucketed by authority.
///
/// `uuids` holds the UPP identifiers: the concept's own uuid plus every alias
/// uuid it has absorbed. Authorities without a dedicated field travel in
/// `identifiers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeIdentifiers {
    #[serde(default)]
    pub uuids: Vec<String>,
    #[serde(
        rename = "TME",
        alias = "tmeIdentifiers",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tme: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factset_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lei_code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,
}

impl AlternativeIdentifiers {
    /// Flatten into `(authority, value)` pairs. Empty values are dropped.
    #[must_use]
    pub fn to_identifiers(&self) -> Vec<Identifier> {
        let mut out = Vec::new();
        out.extend(self.uuids.iter().map(|v| Identifier::new(UPP_AUTHORITY, v)));
        out.extend(self.tme.iter().map(|v| Identifier::new(TME_AUTHORITY, v)));
        if let Some(v) = &self.factset_identifier {
            out.push(Identifier::new(FACTSET_AUTHORITY, v));
        }
        if let Some(v) = &self.lei_code {
            out.push(Identifier::new(LEI_AUTHORITY, v));
        }
        out.extend(self.identifiers.iter().cloned());
        out.retain(|i| !i.value.is_empty());
        out
    }

    /// Bucket pairs by authority. Every bucket is sorted, so a record read
    /// back from the graph is canonical regardless of storage order.
    #[must_use]
    pub fn from_identifiers(pairs: impl IntoIterator<Item = Identifier>) -> Self {
        let mut ids = Self::default();
        let mut factset = Vec::new();
        let mut lei = Vec::new();
        for pair in pairs {
            match pair.authority.as_str() {
                UPP_AUTHORITY => ids.uuids.push(pair.value),
                TME_AUTHORITY => ids.tme.push(pair.value),
                FACTSET_AUTHORITY => factset.push(pair.value),
                LEI_AUTHORITY => lei.push(pair.value),
                _ => ids.identifiers.push(pair),
            }
        }
        ids.uuids.sort();
        ids.uuids.dedup();
        ids.tme.sort();
        ids.tme.dedup();
        ids.identifiers.sort();
        ids.identifiers.dedup();
        factset.sort();
        lei.sort();
        ids.factset_identifier = factset.into_iter().next();
        ids.lei_code = lei.into_iter().next();
        ids
    }
}

// =============================================================================
// ORGANISATION
// =============================================================================

/// Organisation sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrgType {
    #[default]
    Organisation,
    Company,
    PublicCompany,
}

impl From<OrgType> for ConceptType {
    fn from(t: OrgType) -> Self {
        match t {
            OrgType::Organisation => Self::Organisation,
            OrgType::Company => Self::Company,
            OrgType::PublicCompany => Self::PublicCompany,
        }
    }
}

impl TryFrom<ConceptType> for OrgType {
    type Error = ConcordError;

    fn try_from(t: ConceptType) -> Result<Self, Self::Error> {
        match t {
            ConceptType::Organisation => Ok(Self::Organisation),
            ConceptType::Company => Ok(Self::Company),
            ConceptType::PublicCompany => Ok(Self::PublicCompany),
            other => Err(ConcordError::Validation(format!(
                "'{}' is not an organisation type",
                other.as_str()
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organisation {
    pub uuid: String,
    #[serde(rename = "type", default)]
    pub org_type: OrgType,
    #[serde(default)]
    pub proper_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pref_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_label: Option<String>,
    #[serde(default)]
    pub alternative_identifiers: AlternativeIdentifiers,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub former_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trade_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_organisation: Option<String>,
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub uuid: String,
    #[serde(default)]
    pub is_board_role: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pref_label: Option<String>,
    #[serde(default)]
    pub alternative_identifiers: AlternativeIdentifiers,
}

// =============================================================================
// CONCEPT
// =============================================================================

/// Any record the engine can write, read or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Concept {
    Organisation(Organisation),
    Role(Role),
}

impl Concept {
    #[must_use]
    pub fn uuid(&self) -> &str {
        match self {
            Self::Organisation(o) => &o.uuid,
            Self::Role(r) => &r.uuid,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ConceptKind {
        match self {
            Self::Organisation(_) => ConceptKind::Organisation,
            Self::Role(_) => ConceptKind::Role,
        }
    }

    #[must_use]
    pub fn concept_type(&self) -> ConceptType {
        match self {
            Self::Organisation(o) => o.org_type.into(),
            Self::Role(r) if r.is_board_role => ConceptType::BoardRole,
            Self::Role(_) => ConceptType::Role,
        }
    }

    #[must_use]
    pub fn alternative_identifiers(&self) -> &AlternativeIdentifiers {
        match self {
            Self::Organisation(o) => &o.alternative_identifiers,
            Self::Role(r) => &r.alternative_identifiers,
        }
    }

    /// Node properties written for this concept, including the `uuid` and
    /// the `type` discriminator. Empty optionals and lists are omitted.
    #[must_use]
    pub fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert(UUID_PROPERTY.to_string(), self.uuid().into());
        props.insert(
            TYPE_PROPERTY.to_string(),
            self.concept_type().as_str().into(),
        );

        match self {
            Self::Organisation(o) => {
                put_text(&mut props, "properName", Some(&o.proper_name));
                put_text(&mut props, "prefLabel", o.pref_label.as_ref());
                put_text(&mut props, "legalName", o.legal_name.as_ref());
                put_text(&mut props, "shortName", o.short_name.as_ref());
                put_text(&mut props, "hiddenLabel", o.hidden_label.as_ref());
                for (key, list) in [
                    ("formerNames", &o.former_names),
                    ("localNames", &o.local_names),
                    ("tradeNames", &o.trade_names),
                    ("aliases", &o.aliases),
                ] {
                    if !list.is_empty() {
                        props.insert(key.to_string(), PropertyValue::List(list.clone()));
                    }
                }
            }
            Self::Role(r) => {
                put_text(&mut props, "prefLabel", r.pref_label.as_ref());
            }
        }
        props
    }

    /// Managed outgoing edges as `(relationship type, target uuid)`.
    #[must_use]
    pub fn managed_edges(&self) -> Vec<(&'static str, &str)> {
        let mut edges = Vec::new();
        if let Self::Organisation(o) = self {
            if let Some(c) = o.industry_classification.as_deref().filter(|c| !c.is_empty()) {
                edges.push((HAS_CLASSIFICATION, c));
            }
            if let Some(p) = o.parent_organisation.as_deref().filter(|p| !p.is_empty()) {
                edges.push((SUB_ORGANISATION_OF, p));
            }
        }
        edges
    }

    /// Structural checks that need no registry and no store.
    pub fn validate_shape(&self) -> Result<(), ConcordError> {
        check_uuid("uuid", self.uuid())?;
        for (_, target) in self.managed_edges() {
            check_uuid("edge target", target)?;
        }
        let ids = self.alternative_identifiers();
        if ids.uuids.len() + ids.tme.len() + ids.identifiers.len() > MAX_IDENTIFIERS {
            return Err(ConcordError::Validation(format!(
                "too many alternative identifiers (max {MAX_IDENTIFIERS})"
            )));
        }
        for (key, value) in &self.properties() {
            match value {
                PropertyValue::Text(s) if s.len() > MAX_FIELD_LENGTH => {
                    return Err(ConcordError::Validation(format!(
                        "field '{key}' exceeds {MAX_FIELD_LENGTH} bytes"
                    )));
                }
                PropertyValue::List(items)
                    if items.len() > MAX_LIST_LENGTH
                        || items.iter().any(|s| s.len() > MAX_FIELD_LENGTH) =>
                {
                    return Err(ConcordError::Validation(format!(
                        "list field '{key}' is too large"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn put_text(props: &mut Properties, key: &str, value: Option<&String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        props.insert(key.to_string(), PropertyValue::Text(v.clone()));
    }
}

fn check_uuid(what: &str, uuid: &str) -> Result<(), ConcordError> {
    if uuid.trim().is_empty() {
        return Err(ConcordError::Validation(format!("{what} must not be empty")));
    }
    if uuid.len() > MAX_UUID_LENGTH {
        return Err(ConcordError::Validation(format!(
            "{what} exceeds {MAX_UUID_LENGTH} bytes"
        )));
    }
    Ok(())
}

impl From<Organisation> for Concept {
    fn from(o: Organisation) -> Self {
        Self::Organisation(o)
    }
}

impl From<Role> for Concept {
    fn from(r: Role) -> Self {
        Self::Role(r)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn org() -> Organisation {
        Organisation {
            uuid: "org-1".to_string(),
            org_type: OrgType::PublicCompany,
            proper_name: "Acme plc".to_string(),
            former_names: vec!["Acme Ltd".to_string()],
            industry_classification: Some("ic-1".to_string()),
            parent_organisation: Some("parent-1".to_string()),
            alternative_identifiers: AlternativeIdentifiers {
                uuids: vec!["org-1".to_string(), "org-9".to_string()],
                tme: vec!["TME-1".to_string()],
                lei_code: Some("LEI-1".to_string()),
                ..AlternativeIdentifiers::default()
            },
            ..Organisation::default()
        }
    }

    #[test]
    fn identifiers_flatten_and_bucket_back() {
        let ids = org().alternative_identifiers;
        let flat = ids.to_identifiers();
        assert_eq!(flat.len(), 4);
        assert!(flat.contains(&Identifier::new(LEI_AUTHORITY, "LEI-1")));
        assert_eq!(AlternativeIdentifiers::from_identifiers(flat), ids);
    }

    #[test]
    fn unknown_authorities_travel_in_identifiers() {
        let ids = AlternativeIdentifiers::from_identifiers([
            Identifier::new("DUNS", "2"),
            Identifier::new("DUNS", "1"),
        ]);
        assert_eq!(
            ids.identifiers,
            vec![Identifier::new("DUNS", "1"), Identifier::new("DUNS", "2")]
        );
    }

    #[test]
    fn properties_carry_discriminator_and_skip_empties() {
        let concept = Concept::from(org());
        let props = concept.properties();
        assert_eq!(props[TYPE_PROPERTY].as_text(), Some("PublicCompany"));
        assert_eq!(props[UUID_PROPERTY].as_text(), Some("org-1"));
        assert!(props.contains_key("formerNames"));
        assert!(!props.contains_key("tradeNames"));
        assert!(!props.contains_key("legalName"));
    }

    #[test]
    fn managed_edges_only_for_organisations() {
        let concept = Concept::from(org());
        assert_eq!(
            concept.managed_edges(),
            vec![(HAS_CLASSIFICATION, "ic-1"), (SUB_ORGANISATION_OF, "parent-1")]
        );

        let role = Concept::from(Role {
            uuid: "r-1".to_string(),
            is_board_role: true,
            ..Role::default()
        });
        assert!(role.managed_edges().is_empty());
        assert_eq!(role.concept_type(), ConceptType::BoardRole);
    }

    #[test]
    fn empty_uuid_fails_shape_check() {
        let concept = Concept::from(Organisation::default());
        assert!(matches!(
            concept.validate_shape(),
            Err(ConcordError::Validation(_))
        ));
    }
}
