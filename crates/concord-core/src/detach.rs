//! # Delete / Detach
//!
//! Deleting a concept strips its identity and removes the node only when no
//! edge of any kind remains. A node still referenced by another writer's
//! edges survives as a bare `{uuid}` placeholder.

use crate::graph::GraphStore;
use crate::identity::{ConceptKind, IDENTITY_LABELS};
use crate::primitives::MANAGED_RELATIONSHIPS;
use crate::statement::Statement;
use crate::types::ConcordError;

pub struct Detacher;

impl Detacher {
    /// Statements deleting the concept of `kind` stored under `uuid`.
    #[must_use]
    pub fn plan(kind: ConceptKind, uuid: &str) -> Vec<Statement> {
        vec![
            Statement::DetachIdentity {
                uuid: uuid.to_string(),
                required_label: kind.base_label().to_string(),
                remove_labels: IDENTITY_LABELS.iter().map(|l| l.to_string()).collect(),
                managed: MANAGED_RELATIONSHIPS.iter().map(|t| t.to_string()).collect(),
            },
            Statement::DeleteIfOrphan {
                uuid: uuid.to_string(),
            },
        ]
    }

    /// Delete the concept. Returns whether identity data was present, not
    /// whether the node was physically removed.
    pub fn delete<S: GraphStore + ?Sized>(
        store: &mut S,
        kind: ConceptKind,
        uuid: &str,
    ) -> Result<bool, ConcordError> {
        let outcomes = store.execute(&Self::plan(kind, uuid))?;
        let stats: Vec<_> = outcomes.iter().map(|o| o.stats()).collect();
        let detached = stats.first().is_some_and(|s| s.labels_removed > 0);
        let removed = stats.get(1).is_some_and(|s| s.nodes_deleted > 0);
        tracing::debug!(uuid, kind = %kind, detached, removed, "concept deleted");
        Ok(detached)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn deleting_unknown_uuid_is_not_found() {
        let mut graph = Graph::new();
        assert!(!Detacher::delete(&mut graph, ConceptKind::Organisation, "nope").unwrap());
    }

    #[test]
    fn plan_detaches_before_orphan_check() {
        let plan = Detacher::plan(ConceptKind::Role, "r1");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].name(), "detach_identity");
        assert_eq!(plan[1].name(), "delete_if_orphan");
    }
}
