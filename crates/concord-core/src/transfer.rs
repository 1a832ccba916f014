//! # Relationship Transfer
//!
//! Plans the statements that move every relationship of an alias node onto
//! its canonical node. Relationship types are discovered at plan time, so
//! edge types written by other systems are carried over without this crate
//! knowing their names.

use crate::graph::GraphStore;
use crate::statement::Statement;
use crate::types::{ConcordError, Direction};

/// Relationship transfer planner.
pub struct RelationshipTransfer;

impl RelationshipTransfer {
    /// One `TransferEdges` per distinct (type, direction) incident on `alias`.
    ///
    /// Outgoing types come first, each group in type order. A transfer for a
    /// type with no remaining edge at execution time is a no-op.
    pub fn plan<S: GraphStore + ?Sized>(
        store: &S,
        alias: &str,
        canonical: &str,
    ) -> Result<Vec<Statement>, ConcordError> {
        let directions = [Direction::Outgoing, Direction::Incoming];
        let reads: Vec<Statement> = directions
            .iter()
            .map(|direction| Statement::RelationshipTypes {
                uuid: alias.to_string(),
                direction: *direction,
            })
            .collect();

        let mut plan = Vec::new();
        for (direction, outcome) in directions.into_iter().zip(store.query(&reads)?) {
            for rel_type in outcome.into_relationship_types()? {
                plan.push(Statement::TransferEdges {
                    alias_uuid: alias.to_string(),
                    canonical_uuid: canonical.to_string(),
                    rel_type,
                    direction,
                });
            }
        }
        tracing::debug!(alias, canonical, transfers = plan.len(), "planned relationship transfer");
        Ok(plan)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::primitives::{THING_LABEL, UUID_PROPERTY};
    use crate::types::Properties;

    fn thing(uuid: &str) -> Statement {
        let mut properties = Properties::new();
        properties.insert(UUID_PROPERTY.to_string(), uuid.into());
        Statement::CreateNode {
            labels: vec![THING_LABEL.to_string()],
            properties,
        }
    }

    fn edge(from: &str, rel: &str, to: &str) -> Statement {
        Statement::CreateEdge {
            from_uuid: from.into(),
            rel_type: rel.into(),
            to_uuid: to.into(),
            properties: Properties::new(),
        }
    }

    #[test]
    fn plans_every_type_and_direction() {
        let mut graph = Graph::new();
        graph
            .execute(&[
                thing("alias"),
                thing("content"),
                thing("other"),
                edge("content", "MENTIONS", "alias"),
                edge("content", "ABOUT", "alias"),
                edge("alias", "HAS_MEMBER", "other"),
            ])
            .unwrap();

        let plan = RelationshipTransfer::plan(&graph, "alias", "canon").unwrap();
        let summary: Vec<(String, Direction)> = plan
            .into_iter()
            .map(|s| match s {
                Statement::TransferEdges {
                    rel_type, direction, ..
                } => (rel_type, direction),
                other => panic!("unexpected statement {other:?}"),
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("HAS_MEMBER".to_string(), Direction::Outgoing),
                ("ABOUT".to_string(), Direction::Incoming),
                ("MENTIONS".to_string(), Direction::Incoming),
            ]
        );
    }

    #[test]
    fn isolated_alias_needs_no_transfer() {
        let mut graph = Graph::new();
        graph.execute(&[thing("alias")]).unwrap();
        assert!(RelationshipTransfer::plan(&graph, "alias", "canon")
            .unwrap()
            .is_empty());
    }
}
