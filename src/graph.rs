//! Graph query engine: parameterized triple-pattern queries and bounded
//! traversal.
//!
//! Every query issued here is anchored at a node and every traversal
//! carries an explicit depth ceiling; the engine never asks the store an
//! unbounded question. Relations read from the store are checked against
//! the ontology schema, so integrity violations surface instead of being
//! silently traversed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{CustodiaError, GraphError, Result, StoreError};
use crate::ontology::{
    Direction, NodeClass, NodeId, OntologySchema, OwnershipPath, Relation, RelationKind,
};
use crate::providers::{NodeMetadataProvider, TriplePattern, TripleQueryProvider};

/// Which way an edge points relative to the node a neighborhood was
/// explored from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    Incoming,
    Outgoing,
}

/// One edge discovered while exploring a node's neighborhood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborEdge {
    /// Whether the edge is incoming to or outgoing from the start node.
    pub direction: EdgeDirection,
    /// The relation itself.
    pub relation: Relation,
    /// The node on the far side of the edge.
    pub related: NodeId,
    /// Label of the related node, when the store records one.
    pub related_label: Option<String>,
}

/// Executes triple-pattern queries and bounded, cycle-safe traversals.
pub struct GraphQueryEngine {
    triples: Arc<dyn TripleQueryProvider>,
    metadata: Arc<dyn NodeMetadataProvider>,
    schema: OntologySchema,
    store_timeout: Duration,
}

impl GraphQueryEngine {
    /// Create an engine over a triple provider and metadata provider,
    /// using the standard ownership schema.
    pub fn new(
        triples: Arc<dyn TripleQueryProvider>,
        metadata: Arc<dyn NodeMetadataProvider>,
        config: &Config,
    ) -> Self {
        Self {
            triples,
            metadata,
            schema: OntologySchema::standard(),
            store_timeout: config.stores.timeout(),
        }
    }

    /// Direct outgoing edges of `node` with the given predicate, sorted
    /// by object identifier.
    pub async fn out_edges(&self, node: &NodeId, predicate: RelationKind) -> Result<Vec<Relation>> {
        let pattern = TriplePattern::outgoing(node.clone(), predicate);
        let mut relations = self.with_timeout(self.triples.query(&pattern)).await?;
        relations.sort_by(|a, b| a.object.cmp(&b.object));
        self.check_integrity(&relations).await?;
        Ok(relations)
    }

    /// Direct incoming edges of `node` with the given predicate, sorted
    /// by subject identifier.
    pub async fn in_edges(&self, node: &NodeId, predicate: RelationKind) -> Result<Vec<Relation>> {
        let pattern = TriplePattern::incoming(predicate, node.clone());
        let mut relations = self.with_timeout(self.triples.query(&pattern)).await?;
        relations.sort_by(|a, b| a.subject.cmp(&b.subject));
        self.check_integrity(&relations).await?;
        Ok(relations)
    }

    /// Repeated expansion along `predicate` in `direction`, collecting
    /// every path of one to `max_depth` relations.
    ///
    /// Expanding into a node already on the current path fails with
    /// [`GraphError::CycleDetected`]. Hitting the depth ceiling while
    /// edges remain unexpanded fails with [`GraphError::DepthExceeded`]
    /// rather than silently truncating.
    pub async fn transitive_closure(
        &self,
        start: &NodeId,
        predicate: RelationKind,
        direction: Direction,
        max_depth: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<OwnershipPath>> {
        let mut paths = Vec::new();
        let mut frontier: Vec<(NodeId, OwnershipPath)> =
            vec![(start.clone(), OwnershipPath::new())];

        for _ in 0..max_depth {
            let mut next = Vec::new();
            for (node, path) in &frontier {
                if cancel.is_cancelled() {
                    return Err(CustodiaError::Cancelled);
                }
                for relation in self.edges_in_direction(node, predicate, direction).await? {
                    let next_node = match direction {
                        Direction::Forward => relation.object.clone(),
                        Direction::Backward => relation.subject.clone(),
                    };
                    if next_node == *start || path.contains_node(&next_node) {
                        tracing::warn!(
                            "cycle detected at {} while expanding {} from {}",
                            next_node,
                            predicate,
                            start
                        );
                        return Err(GraphError::CycleDetected(next_node).into());
                    }
                    let mut new_path = path.clone();
                    new_path.push(relation);
                    paths.push(new_path.clone());
                    next.push((next_node, new_path));
                }
            }
            if next.is_empty() {
                return Ok(paths);
            }
            frontier = next;
        }

        // The ceiling was reached; report any expansion left undone.
        for (node, _) in &frontier {
            if cancel.is_cancelled() {
                return Err(CustodiaError::Cancelled);
            }
            let remaining = self.edges_in_direction(node, predicate, direction).await?;
            if !remaining.is_empty() {
                return Err(GraphError::DepthExceeded {
                    node: node.clone(),
                    max_depth,
                }
                .into());
            }
        }
        Ok(paths)
    }

    /// Incoming and outgoing labeled edges around a node, across all
    /// relation kinds, sorted by (direction, predicate, related id).
    ///
    /// The explain/debug surface: ambiguity and no-owner errors point
    /// callers here to inspect what the graph actually records.
    pub async fn neighborhood(&self, node: &NodeId, limit: usize) -> Result<Vec<NeighborEdge>> {
        let mut edges = Vec::new();

        for kind in RelationKind::all() {
            for relation in self.out_edges(node, *kind).await? {
                let related = relation.object.clone();
                let related_label = self.with_timeout(self.metadata.label_of(&related)).await?;
                edges.push(NeighborEdge {
                    direction: EdgeDirection::Outgoing,
                    relation,
                    related,
                    related_label,
                });
            }
            for relation in self.in_edges(node, *kind).await? {
                let related = relation.subject.clone();
                let related_label = self.with_timeout(self.metadata.label_of(&related)).await?;
                edges.push(NeighborEdge {
                    direction: EdgeDirection::Incoming,
                    relation,
                    related,
                    related_label,
                });
            }
        }

        edges.sort_by(|a, b| {
            a.direction
                .cmp(&b.direction)
                .then_with(|| a.relation.predicate.display_name().cmp(b.relation.predicate.display_name()))
                .then_with(|| a.related.cmp(&b.related))
        });
        edges.truncate(limit);
        Ok(edges)
    }

    async fn edges_in_direction(
        &self,
        node: &NodeId,
        predicate: RelationKind,
        direction: Direction,
    ) -> Result<Vec<Relation>> {
        match direction {
            Direction::Forward => self.out_edges(node, predicate).await,
            Direction::Backward => self.in_edges(node, predicate).await,
        }
    }

    /// Verify each relation's endpoint classes against the schema.
    ///
    /// Violations are data-integrity errors and are reported, never
    /// dropped.
    async fn check_integrity(&self, relations: &[Relation]) -> Result<()> {
        let mut classes: HashMap<NodeId, Option<NodeClass>> = HashMap::new();

        for relation in relations {
            for id in [&relation.subject, &relation.object] {
                if !classes.contains_key(id) {
                    let class = self.with_timeout(self.metadata.class_of(id)).await?;
                    classes.insert(id.clone(), class);
                }
            }

            let valid = match (&classes[&relation.subject], &classes[&relation.object]) {
                (Some(s), Some(o)) => self.schema.is_valid_relation(relation.predicate, *s, *o),
                _ => false,
            };
            if !valid {
                return Err(GraphError::SchemaViolation {
                    subject: relation.subject.clone(),
                    predicate: relation.predicate,
                    object: relation.object.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| {
                StoreError::Unavailable(format!(
                    "external call timed out after {:?}",
                    self.store_timeout
                ))
            })?
    }
}
