//! # Concordance
//!
//! Absorption of an alias node into its canonical node.
//!
//! The plan is computed from a read of the alias, then executed later as part
//! of the canonical write. A leading `ExpectNodeCount` guard aborts the whole
//! batch if another writer created or removed the alias in between.

use crate::graph::GraphStore;
use crate::primitives::MANAGED_RELATIONSHIPS;
use crate::statement::Statement;
use crate::transfer::RelationshipTransfer;
use crate::types::ConcordError;

/// Alias absorption planner.
pub struct ConcordanceResolver;

impl ConcordanceResolver {
    /// Plan the absorption of `alias` into `canonical`.
    ///
    /// - no node for `alias`: nothing to do, empty plan
    /// - exactly one node: strip its managed edges and identifiers, move every
    ///   remaining edge, then delete it
    /// - several nodes: the store is corrupt and nothing is planned
    pub fn absorb<S: GraphStore + ?Sized>(
        store: &S,
        alias: &str,
        canonical: &str,
    ) -> Result<Vec<Statement>, ConcordError> {
        if alias == canonical {
            return Ok(Vec::new());
        }
        let count = store
            .query(&[Statement::CountNodes {
                uuid: alias.to_string(),
            }])?
            .into_iter()
            .next()
            .ok_or_else(|| ConcordError::Store("empty result for node count".to_string()))?
            .into_count()?;

        match count {
            0 => Ok(Vec::new()),
            1 => {
                let mut plan = vec![
                    Statement::ExpectNodeCount {
                        uuid: alias.to_string(),
                        expected: 1,
                    },
                    Statement::DeleteManagedEdges {
                        uuid: alias.to_string(),
                        rel_types: MANAGED_RELATIONSHIPS.iter().map(|t| t.to_string()).collect(),
                    },
                    Statement::ClearIdentifiers {
                        uuid: alias.to_string(),
                    },
                ];
                plan.extend(RelationshipTransfer::plan(store, alias, canonical)?);
                plan.push(Statement::DeleteNode {
                    uuid: alias.to_string(),
                });
                tracing::debug!(alias, canonical, statements = plan.len(), "planned alias absorption");
                Ok(plan)
            }
            n => {
                tracing::error!(
                    alias,
                    canonical,
                    count = n,
                    "multiple nodes share alias uuid; refusing to concord"
                );
                Err(ConcordError::InconsistentStore {
                    uuid: alias.to_string(),
                    count: n,
                })
            }
        }
    }
}
