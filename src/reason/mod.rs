//! Ownership reasoning over the service knowledge graph.
//!
//! Orchestrates entity resolution, class validation, and bounded graph
//! traversal to answer ownership questions in both directions. The
//! reasoner is stateless between requests; every call is independent and
//! safe to run concurrently with others.
//!
//! Tie-break policy: direct ownership always wins over ownership
//! inherited through containment. Walking outward from a resource, the
//! first container with a direct owner decides, even when a larger
//! container has a different owner. Reverse enumeration enforces the same
//! rule by excluding containees that another team owns directly, keeping
//! the two directions mutually consistent.

mod types;

pub use types::{OwnedResource, OwnedResources, OwnershipResult, TraversalStats};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{CustodiaError, GraphError, Result, ResolutionError, StoreError};
use crate::graph::GraphQueryEngine;
use crate::ontology::{
    Candidate, Node, NodeClass, NodeId, OntologyValidator, OwnershipPath, Relation, RelationKind,
};
use crate::providers::NodeMetadataProvider;
use crate::resolve::EntityResolver;

/// Computes forward (resource to team) and reverse (team to resources)
/// ownership.
pub struct OwnershipReasoner {
    resolver: Arc<EntityResolver>,
    validator: Arc<OntologyValidator>,
    graph: Arc<GraphQueryEngine>,
    metadata: Arc<dyn NodeMetadataProvider>,
    ambiguity_margin: f32,
    max_depth: usize,
    max_concurrent_branches: usize,
    store_timeout: Duration,
}

impl OwnershipReasoner {
    /// Create a reasoner over the resolution and traversal components.
    pub fn new(
        resolver: Arc<EntityResolver>,
        validator: Arc<OntologyValidator>,
        graph: Arc<GraphQueryEngine>,
        metadata: Arc<dyn NodeMetadataProvider>,
        config: &Config,
    ) -> Self {
        tracing::info!(
            "ownership reasoner ready (max_depth: {}, ambiguity_margin: {})",
            config.traversal.max_depth,
            config.resolver.ambiguity_margin
        );
        Self {
            resolver,
            validator,
            graph,
            metadata,
            ambiguity_margin: config.resolver.ambiguity_margin,
            max_depth: config.traversal.max_depth,
            max_concurrent_branches: config.traversal.max_concurrent_branches,
            store_timeout: config.stores.timeout(),
        }
    }

    /// Wire up the full resolution stack over a set of providers.
    ///
    /// Convenience for the common case where resolver, validator, and
    /// query engine share one configuration.
    pub fn from_providers(
        embedder: Arc<dyn crate::providers::EmbeddingProvider>,
        index: Arc<dyn crate::providers::SimilaritySearchProvider>,
        triples: Arc<dyn crate::providers::TripleQueryProvider>,
        metadata: Arc<dyn NodeMetadataProvider>,
        config: &Config,
    ) -> Self {
        let resolver = Arc::new(EntityResolver::new(
            embedder,
            index,
            metadata.clone(),
            config,
        ));
        let validator = Arc::new(OntologyValidator::new(metadata.clone()));
        let graph = Arc::new(GraphQueryEngine::new(triples, metadata.clone(), config));
        Self::new(resolver, validator, graph, metadata, config)
    }

    // ========================================================================
    // Forward resolution
    // ========================================================================

    /// Resolve the owning team of a resource reference.
    pub async fn find_owner(&self, resource_ref: &str) -> Result<OwnershipResult> {
        self.find_owner_cancellable(resource_ref, &CancellationToken::new())
            .await
    }

    /// Resolve the owning team of a resource reference, honoring a
    /// caller-supplied cancellation token.
    ///
    /// Walks outward from the resolved resource: a direct `owns_directly`
    /// in-edge wins immediately; otherwise containment is expanded one
    /// hop at a time and the first container with a direct owner decides.
    pub async fn find_owner_cancellable(
        &self,
        resource_ref: &str,
        cancel: &CancellationToken,
    ) -> Result<OwnershipResult> {
        let started = Instant::now();

        let candidates = self.resolver.resolve(resource_ref, None, cancel).await?;
        let target = self.select_candidate(resource_ref, candidates)?;
        self.validator
            .validate(&target.node, NodeClass::ownable())
            .await?;

        let start_id = target.node.id.clone();
        let mut stats = TraversalStats::default();
        let mut frontier: Vec<(NodeId, OwnershipPath)> =
            vec![(start_id.clone(), OwnershipPath::new())];
        let mut paths_explored = 0usize;
        let mut hops = 0usize;

        loop {
            // Nearest container with a direct owner wins; the frontier is
            // kept in identifier order so ties at equal depth are
            // deterministic.
            for (node, path) in &frontier {
                if cancel.is_cancelled() {
                    return Err(CustodiaError::Cancelled);
                }
                stats.nodes_visited += 1;
                let owners = self.graph.in_edges(node, RelationKind::OwnsDirectly).await?;
                stats.edges_traversed += owners.len();
                if let Some(owning) = owners.into_iter().next() {
                    let owner = self.materialize(&owning.subject, NodeClass::Team).await?;
                    let mut full_path = path.clone();
                    full_path.push(owning);
                    stats.max_depth_reached = full_path.len();
                    stats.execution_time_ms = started.elapsed().as_millis() as u64;
                    tracing::debug!(
                        "resolved owner of '{}': {} via {} hop(s)",
                        resource_ref,
                        owner.id,
                        full_path.len()
                    );
                    return Ok(OwnershipResult {
                        owner,
                        path: full_path,
                        stats,
                    });
                }
            }

            // The next expansion adds a containment hop and the final
            // owning edge still has to fit under the ceiling.
            if hops + 2 > self.max_depth {
                return Err(GraphError::NoOwnerFound {
                    reference: resource_ref.to_string(),
                    paths_explored: paths_explored + frontier.len(),
                }
                .into());
            }

            let mut next: Vec<(NodeId, OwnershipPath)> = Vec::new();
            for (node, path) in &frontier {
                let containers = self.graph.out_edges(node, RelationKind::PartOf).await?;
                stats.edges_traversed += containers.len();
                if containers.is_empty() {
                    // This containment chain ends without an owner.
                    paths_explored += 1;
                    continue;
                }
                for relation in containers {
                    let container = relation.object.clone();
                    if container == start_id || path.contains_node(&container) {
                        tracing::warn!(
                            "containment cycle at {} while resolving '{}'",
                            container,
                            resource_ref
                        );
                        return Err(GraphError::CycleDetected(container).into());
                    }
                    let mut new_path = path.clone();
                    new_path.push(relation);
                    next.push((container, new_path));
                }
            }

            if next.is_empty() {
                return Err(GraphError::NoOwnerFound {
                    reference: resource_ref.to_string(),
                    paths_explored,
                }
                .into());
            }
            next.sort_by(|a, b| a.0.cmp(&b.0));
            frontier = next;
            hops += 1;
        }
    }

    // ========================================================================
    // Reverse enumeration
    // ========================================================================

    /// Enumerate everything a team owns, directly or through containment.
    pub async fn find_owned_resources(&self, team_ref: &str) -> Result<OwnedResources> {
        self.find_owned_resources_cancellable(team_ref, &CancellationToken::new())
            .await
    }

    /// Enumerate everything a team owns, honoring a caller-supplied
    /// cancellation token.
    ///
    /// Each directly owned resource roots a containment subtree that is
    /// expanded inward, excluding any containee another team owns
    /// directly (and everything inside it). Independent subtrees are
    /// expanded with bounded parallelism.
    pub async fn find_owned_resources_cancellable(
        &self,
        team_ref: &str,
        cancel: &CancellationToken,
    ) -> Result<OwnedResources> {
        let started = Instant::now();

        let candidates = self
            .resolver
            .resolve(team_ref, Some(&[NodeClass::Team]), cancel)
            .await?;
        let team = self.select_candidate(team_ref, candidates)?;
        self.validator.validate(&team.node, &[NodeClass::Team]).await?;

        let team_id = team.node.id.clone();
        let direct = self
            .graph
            .out_edges(&team_id, RelationKind::OwnsDirectly)
            .await?;

        let branch_results: Vec<Result<(Vec<OwnedResource>, TraversalStats)>> =
            stream::iter(direct.into_iter().map(|owning| {
                let cancel = cancel.clone();
                let team_id = team_id.clone();
                async move { self.collect_subtree(&team_id, owning, &cancel).await }
            }))
            .buffer_unordered(self.max_concurrent_branches)
            .collect()
            .await;

        let mut stats = TraversalStats::default();
        let mut best: HashMap<NodeId, OwnedResource> = HashMap::new();
        for result in branch_results {
            let (resources, branch_stats) = result?;
            stats.merge(branch_stats);
            for owned in resources {
                match best.entry(owned.node.id.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(owned);
                    }
                    Entry::Occupied(mut entry) => {
                        if Self::path_is_better(&owned.path, &entry.get().path) {
                            entry.insert(owned);
                        }
                    }
                }
            }
        }

        let mut resources: Vec<OwnedResource> = best.into_values().collect();
        resources.sort_by(|a, b| a.node.id.cmp(&b.node.id));
        stats.max_depth_reached = resources.iter().map(|r| r.path.len()).max().unwrap_or(0);
        stats.execution_time_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            "team {} owns {} resource(s)",
            team.node.id,
            resources.len()
        );
        Ok(OwnedResources {
            team: team.node,
            resources,
            stats,
        })
    }

    /// Expand one directly owned resource into the containees it carries
    /// with it.
    async fn collect_subtree(
        &self,
        team_id: &NodeId,
        owning: Relation,
        cancel: &CancellationToken,
    ) -> Result<(Vec<OwnedResource>, TraversalStats)> {
        let root_id = owning.object.clone();
        let root_path = OwnershipPath::from_relations(vec![owning]);
        let root_node = self.materialize(&root_id, NodeClass::Resource).await?;

        let mut stats = TraversalStats::default();
        let mut collected = vec![OwnedResource {
            node: root_node,
            path: root_path.clone(),
        }];
        let mut frontier: Vec<(NodeId, OwnershipPath)> = vec![(root_id, root_path)];
        let mut hops = 0usize;

        while !frontier.is_empty() {
            if cancel.is_cancelled() {
                return Err(CustodiaError::Cancelled);
            }

            // Path length is the owning edge plus the containment hops;
            // the ceiling applies to the whole path.
            if hops + 2 > self.max_depth {
                for (node, path) in &frontier {
                    if !self.eligible_containees(node, path).await?.is_empty() {
                        return Err(GraphError::DepthExceeded {
                            node: node.clone(),
                            max_depth: self.max_depth,
                        }
                        .into());
                    }
                }
                break;
            }

            let mut next: Vec<(NodeId, OwnershipPath)> = Vec::new();
            for (node, path) in &frontier {
                stats.nodes_visited += 1;
                let containees = self.graph.in_edges(node, RelationKind::PartOf).await?;
                stats.edges_traversed += containees.len();

                for relation in containees {
                    let child = relation.subject.clone();
                    if path.contains_node(&child) {
                        tracing::warn!(
                            "containment cycle at {} while enumerating team {}",
                            child,
                            team_id
                        );
                        return Err(GraphError::CycleDetected(child).into());
                    }

                    // A containee with its own direct owner is not
                    // inherited through this subtree: if this team owns
                    // it, its own branch covers it; if another team does,
                    // it and everything inside it are excluded.
                    let owners = self.graph.in_edges(&child, RelationKind::OwnsDirectly).await?;
                    stats.edges_traversed += owners.len();
                    if !owners.is_empty() {
                        continue;
                    }

                    let mut child_path = path.clone();
                    child_path.push(relation);
                    let child_node = self.materialize(&child, NodeClass::Resource).await?;
                    collected.push(OwnedResource {
                        node: child_node,
                        path: child_path.clone(),
                    });
                    next.push((child, child_path));
                }
            }

            next.sort_by(|a, b| a.0.cmp(&b.0));
            frontier = next;
            hops += 1;
        }

        Ok((collected, stats))
    }

    /// Containees of `node` that would be inherited (no direct owner of
    /// their own) and would not close a cycle.
    async fn eligible_containees(
        &self,
        node: &NodeId,
        path: &OwnershipPath,
    ) -> Result<Vec<NodeId>> {
        let mut eligible = Vec::new();
        for relation in self.graph.in_edges(node, RelationKind::PartOf).await? {
            let child = relation.subject;
            if path.contains_node(&child) {
                return Err(GraphError::CycleDetected(child).into());
            }
            let owners = self.graph.in_edges(&child, RelationKind::OwnsDirectly).await?;
            if owners.is_empty() {
                eligible.push(child);
            }
        }
        Ok(eligible)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Apply the not-found and ambiguity policy to a ranked candidate
    /// list and pick the winner.
    fn select_candidate(
        &self,
        reference: &str,
        mut candidates: Vec<Candidate>,
    ) -> Result<Candidate> {
        let top_score = match candidates.first() {
            None => {
                return Err(ResolutionError::NotFound {
                    reference: reference.to_string(),
                }
                .into())
            }
            Some(top) => top.score,
        };

        if candidates.len() >= 2 && top_score - candidates[1].score < self.ambiguity_margin {
            let tied: Vec<Candidate> = candidates
                .iter()
                .filter(|c| top_score - c.score < self.ambiguity_margin)
                .cloned()
                .collect();
            tracing::debug!(
                "reference '{}' is ambiguous across {} candidates",
                reference,
                tied.len()
            );
            return Err(ResolutionError::Ambiguous {
                reference: reference.to_string(),
                candidates: tied,
            }
            .into());
        }

        Ok(candidates.swap_remove(0))
    }

    /// Build a full node from the metadata the store records for an
    /// identifier.
    async fn materialize(&self, id: &NodeId, fallback_class: NodeClass) -> Result<Node> {
        let class = self
            .with_timeout(self.metadata.class_of(id))
            .await?
            .unwrap_or(fallback_class);
        let label = self
            .with_timeout(self.metadata.label_of(id))
            .await?
            .unwrap_or_else(|| id.to_string());
        Ok(Node::new(id.clone(), class, label))
    }

    /// Shorter paths win; equal lengths fall back to the lexicographic
    /// identifier sequence.
    fn path_is_better(candidate: &OwnershipPath, incumbent: &OwnershipPath) -> bool {
        match candidate.len().cmp(&incumbent.len()) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => candidate.id_sequence() < incumbent.id_sequence(),
        }
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
