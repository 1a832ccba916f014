//! # Read Reconstructor
//!
//! Rebuilds a concept record from its node, its managed edge targets and its
//! identifier nodes. The concrete type comes from the stored `type`
//! discriminator, never from the label set.

use crate::graph::GraphStore;
use crate::identity::{AuthorityRegistry, ConceptKind, ConceptType};
use crate::model::{AlternativeIdentifiers, Concept, Identifier, OrgType, Organisation, Role};
use crate::primitives::TYPE_PROPERTY;
use crate::statement::{ConceptRow, Statement};
use crate::types::{ConcordError, Node};

#[derive(Debug, Clone, Copy)]
pub struct ReadReconstructor<'r> {
    registry: &'r AuthorityRegistry,
}

impl<'r> ReadReconstructor<'r> {
    #[must_use]
    pub fn new(registry: &'r AuthorityRegistry) -> Self {
        Self { registry }
    }

    /// Read the concept of `kind` stored under `uuid`.
    ///
    /// `Ok(None)` when no node carries the uuid, when the node is a bare
    /// placeholder, or when it holds a concept of another kind.
    pub fn read<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        kind: ConceptKind,
        uuid: &str,
    ) -> Result<Option<Concept>, ConcordError> {
        let row = store
            .query(&[Statement::FetchConcept {
                uuid: uuid.to_string(),
            }])?
            .into_iter()
            .next()
            .ok_or_else(|| ConcordError::Store("empty result for concept fetch".to_string()))?
            .into_concept()?;
        match row {
            Some(row) => Ok(self.reconstruct(kind, &row)),
            None => Ok(None),
        }
    }

    /// Pure reconstruction from a fetched row.
    #[must_use]
    pub fn reconstruct(&self, kind: ConceptKind, row: &ConceptRow) -> Option<Concept> {
        let node = &row.node;
        let concept_type: ConceptType = node.text(TYPE_PROPERTY)?.parse().ok()?;
        if concept_type.kind() != kind || !node.has_label(kind.base_label()) {
            return None;
        }
        let uuid = node.uuid()?.to_string();

        let mut pairs = Vec::new();
        for (label, values) in &row.identifiers {
            let Some(identifier_kind) = self.registry.by_label(label) else {
                tracing::warn!(uuid = %uuid, label = %label, "skipping identifier with unregistered label");
                continue;
            };
            pairs.extend(
                values
                    .iter()
                    .map(|v| Identifier::new(identifier_kind.authority.clone(), v.clone())),
            );
        }
        let alternative_identifiers = AlternativeIdentifiers::from_identifiers(pairs);

        match concept_type {
            ConceptType::Role | ConceptType::BoardRole => Some(Concept::Role(Role {
                uuid,
                is_board_role: concept_type == ConceptType::BoardRole,
                pref_label: text(node, "prefLabel"),
                alternative_identifiers,
            })),
            other => Some(Concept::Organisation(Organisation {
                uuid,
                org_type: OrgType::try_from(other).ok()?,
                proper_name: text(node, "properName").unwrap_or_default(),
                pref_label: text(node, "prefLabel"),
                legal_name: text(node, "legalName"),
                short_name: text(node, "shortName"),
                hidden_label: text(node, "hiddenLabel"),
                alternative_identifiers,
                former_names: list(node, "formerNames"),
                local_names: list(node, "localNames"),
                trade_names: list(node, "tradeNames"),
                aliases: list(node, "aliases"),
                industry_classification: row.classification.clone(),
                parent_organisation: row.parent.clone(),
            })),
        }
    }
}

fn text(node: &Node, key: &str) -> Option<String> {
    node.text(key).map(str::to_string)
}

fn list(node: &Node, key: &str) -> Vec<String> {
    node.properties
        .get(key)
        .and_then(|v| v.as_list())
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::identity::TME_IDENTIFIER_LABEL;
    use crate::primitives::{THING_LABEL, UUID_PROPERTY};
    use crate::types::{NodeId, Properties};
    use std::collections::{BTreeMap, BTreeSet};

    fn row(labels: &[&str], props: &[(&str, &str)]) -> ConceptRow {
        let mut node = Node::new(NodeId(0));
        node.labels = labels.iter().map(|l| l.to_string()).collect::<BTreeSet<_>>();
        for (k, v) in props {
            node.properties.insert(k.to_string(), (*v).into());
        }
        ConceptRow {
            node,
            classification: None,
            parent: None,
            identifiers: BTreeMap::new(),
        }
    }

    #[test]
    fn type_comes_from_discriminator_not_label_count() {
        let registry = AuthorityRegistry::standard();
        let reader = ReadReconstructor::new(&registry);
        let r = row(
            &["Organisation", "Concept", "Thing", "Extra", "Another"],
            &[(UUID_PROPERTY, "u1"), (TYPE_PROPERTY, "Organisation")],
        );
        let Some(Concept::Organisation(org)) = reader.reconstruct(ConceptKind::Organisation, &r)
        else {
            panic!("expected organisation");
        };
        assert_eq!(org.org_type, OrgType::Organisation);
    }

    #[test]
    fn kind_mismatch_reads_as_absent() {
        let registry = AuthorityRegistry::standard();
        let reader = ReadReconstructor::new(&registry);
        let r = row(
            &["Role", "Concept", "Thing"],
            &[(UUID_PROPERTY, "r1"), (TYPE_PROPERTY, "Role")],
        );
        assert!(reader.reconstruct(ConceptKind::Organisation, &r).is_none());
        assert!(reader.reconstruct(ConceptKind::Role, &r).is_some());
    }

    #[test]
    fn identifiers_bucket_by_authority_sorted() {
        let registry = AuthorityRegistry::standard();
        let reader = ReadReconstructor::new(&registry);
        let mut r = row(
            &["Organisation", "Concept", "Thing"],
            &[(UUID_PROPERTY, "u1"), (TYPE_PROPERTY, "Organisation")],
        );
        r.identifiers.insert(
            TME_IDENTIFIER_LABEL.to_string(),
            vec!["b".to_string(), "a".to_string()],
        );
        r.identifiers
            .insert("MysteryIdentifier".to_string(), vec!["m".to_string()]);
        let concept = reader.reconstruct(ConceptKind::Organisation, &r).unwrap();
        assert_eq!(
            concept.alternative_identifiers().tme,
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(concept.alternative_identifiers().identifiers.is_empty());
    }

    #[test]
    fn placeholder_reads_as_not_found() {
        let registry = AuthorityRegistry::standard();
        let reader = ReadReconstructor::new(&registry);
        let mut graph = Graph::new();
        let mut properties = Properties::new();
        properties.insert(UUID_PROPERTY.to_string(), "p".into());
        graph
            .execute(&[Statement::CreateNode {
                labels: vec![THING_LABEL.to_string()],
                properties,
            }])
            .unwrap();
        assert!(reader
            .read(&graph, ConceptKind::Organisation, "p")
            .unwrap()
            .is_none());
        assert!(reader
            .read(&graph, ConceptKind::Organisation, "missing")
            .unwrap()
            .is_none());
    }
}
