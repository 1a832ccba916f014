//! # Write Orchestrator
//!
//! Builds the single ordered batch that writes one concept:
//!
//! 1. delete the canonical node's managed edges
//! 2. reset its labels and properties (full overwrite)
//! 3. absorb every alias named by a UPP identifier other than its own uuid
//! 4. rebuild its identifier nodes, including the self UPP identifier
//! 5. set the label chain of its type
//! 6. merge classification and parent edges
//!
//! Every identifier is resolved against the registry before the store is
//! read, so an unsupported authority never reaches the store.

use crate::concordance::ConcordanceResolver;
use crate::graph::GraphStore;
use crate::identity::{AuthorityRegistry, IDENTITY_LABELS, IdentifierKind, UPP_AUTHORITY};
use crate::model::{Concept, Identifier};
use crate::primitives::MANAGED_RELATIONSHIPS;
use crate::statement::{Statement, StatementStats, total_stats};
use crate::types::ConcordError;

/// A planned write, ready for one `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub uuid: String,
    pub statements: Vec<Statement>,
    /// Alias uuids that exist in the store and will be absorbed.
    pub absorbed: Vec<String>,
}

/// Result of an executed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub uuid: String,
    pub absorbed: Vec<String>,
    pub stats: StatementStats,
}

/// Plans and executes concept writes against an injected authority registry.
#[derive(Debug, Clone, Copy)]
pub struct WriteOrchestrator<'r> {
    registry: &'r AuthorityRegistry,
}

impl<'r> WriteOrchestrator<'r> {
    #[must_use]
    pub fn new(registry: &'r AuthorityRegistry) -> Self {
        Self { registry }
    }

    /// Resolve every identifier of `concept`, plus its self UPP identifier.
    ///
    /// Pairs are deduplicated in first-seen order.
    pub fn resolve_identifiers(
        &self,
        concept: &Concept,
    ) -> Result<Vec<(Identifier, &'r IdentifierKind)>, ConcordError> {
        concept.validate_shape()?;

        let mut pairs = concept.alternative_identifiers().to_identifiers();
        let own = Identifier::new(UPP_AUTHORITY, concept.uuid());
        if !pairs.contains(&own) {
            pairs.push(own);
        }

        let mut resolved: Vec<(Identifier, &'r IdentifierKind)> = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let kind = self.registry.resolve(&pair.authority)?;
            if !resolved.iter().any(|(seen, _)| *seen == pair) {
                resolved.push((pair, kind));
            }
        }
        Ok(resolved)
    }

    /// Plan the write of `concept` against the current state of `store`.
    pub fn plan<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        concept: &Concept,
    ) -> Result<WritePlan, ConcordError> {
        let identifiers = self.resolve_identifiers(concept)?;
        let uuid = concept.uuid();

        let mut statements = vec![
            Statement::DeleteManagedEdges {
                uuid: uuid.to_string(),
                rel_types: MANAGED_RELATIONSHIPS.iter().map(|t| t.to_string()).collect(),
            },
            Statement::ResetNode {
                uuid: uuid.to_string(),
                remove_labels: IDENTITY_LABELS.iter().map(|l| l.to_string()).collect(),
                properties: concept.properties(),
            },
        ];

        let mut absorbed = Vec::new();
        for (identifier, _) in &identifiers {
            if identifier.authority != UPP_AUTHORITY || identifier.value == uuid {
                continue;
            }
            let absorption = ConcordanceResolver::absorb(store, &identifier.value, uuid)?;
            if !absorption.is_empty() {
                absorbed.push(identifier.value.clone());
                statements.extend(absorption);
            }
        }

        statements.push(Statement::ClearIdentifiers {
            uuid: uuid.to_string(),
        });
        for (identifier, kind) in &identifiers {
            statements.push(Statement::WriteIdentifier {
                uuid: uuid.to_string(),
                label: kind.label.clone(),
                authority: kind.authority.clone(),
                value: identifier.value.clone(),
                unique: kind.unique,
            });
        }

        statements.push(Statement::AddLabels {
            uuid: uuid.to_string(),
            labels: concept
                .concept_type()
                .label_chain()
                .iter()
                .map(|l| l.to_string())
                .collect(),
        });

        for (rel_type, target) in concept.managed_edges() {
            statements.push(Statement::MergeEdge {
                from_uuid: uuid.to_string(),
                rel_type: rel_type.to_string(),
                to_uuid: target.to_string(),
            });
        }

        Ok(WritePlan {
            uuid: uuid.to_string(),
            statements,
            absorbed,
        })
    }

    /// Plan and execute the write of `concept` as one atomic batch.
    pub fn write<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        concept: &Concept,
    ) -> Result<WriteSummary, ConcordError> {
        let plan = self.plan(store, concept)?;
        let outcomes = store.execute(&plan.statements)?;
        let stats = total_stats(&outcomes);
        tracing::info!(
            uuid = %plan.uuid,
            kind = %concept.kind(),
            absorbed = plan.absorbed.len(),
            statements = plan.statements.len(),
            "concept written"
        );
        Ok(WriteSummary {
            uuid: plan.uuid,
            absorbed: plan.absorbed,
            stats,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::model::{AlternativeIdentifiers, Organisation};

    fn org(uuid: &str, uuids: &[&str]) -> Concept {
        Concept::from(Organisation {
            uuid: uuid.to_string(),
            proper_name: format!("Org {uuid}"),
            alternative_identifiers: AlternativeIdentifiers {
                uuids: uuids.iter().map(|u| u.to_string()).collect(),
                ..AlternativeIdentifiers::default()
            },
            ..Organisation::default()
        })
    }

    #[test]
    fn self_upp_identifier_is_always_written() {
        let registry = AuthorityRegistry::standard();
        let writer = WriteOrchestrator::new(&registry);
        let resolved = writer.resolve_identifiers(&org("u1", &[])).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, Identifier::new(UPP_AUTHORITY, "u1"));
    }

    #[test]
    fn unknown_authority_fails_before_any_read() {
        let registry = AuthorityRegistry::standard();
        let writer = WriteOrchestrator::new(&registry);
        let mut concept = org("u1", &["u1"]);
        if let Concept::Organisation(o) = &mut concept {
            o.alternative_identifiers
                .identifiers
                .push(Identifier::new("DUNS", "123"));
        }
        let err = writer.plan(&Graph::new(), &concept).unwrap_err();
        assert!(matches!(err, ConcordError::Validation(_)));
    }

    #[test]
    fn plan_orders_reset_before_identifiers_and_labels() {
        let registry = AuthorityRegistry::standard();
        let writer = WriteOrchestrator::new(&registry);
        let plan = writer.plan(&Graph::new(), &org("u1", &["u1"])).unwrap();
        let names: Vec<&str> = plan.statements.iter().map(Statement::name).collect();
        assert_eq!(
            names,
            vec![
                "delete_managed_edges",
                "reset_node",
                "clear_identifiers",
                "write_identifier",
                "add_labels",
            ]
        );
        assert!(plan.absorbed.is_empty());
    }

    #[test]
    fn missing_alias_is_not_absorbed() {
        let registry = AuthorityRegistry::standard();
        let writer = WriteOrchestrator::new(&registry);
        let plan = writer
            .plan(&Graph::new(), &org("u1", &["u1", "ghost"]))
            .unwrap();
        assert!(plan.absorbed.is_empty());
    }

    #[test]
    fn existing_alias_is_absorbed_in_the_same_batch() {
        let registry = AuthorityRegistry::standard();
        let writer = WriteOrchestrator::new(&registry);
        let mut graph = Graph::new();
        writer.write(&mut graph, &org("u2", &["u2"])).unwrap();

        let summary = writer.write(&mut graph, &org("u1", &["u1", "u2"])).unwrap();
        assert_eq!(summary.absorbed, vec!["u2".to_string()]);
        assert!(graph.nodes_with_uuid("u2").is_empty());
        assert_eq!(graph.identifier_owners("UPPIdentifier", "u2"), vec!["u1"]);
    }
}
