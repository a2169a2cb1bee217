//! Result types for ownership reasoning.

use serde::{Deserialize, Serialize};

use crate::ontology::{Node, OwnershipPath};

/// The answer to "who owns this resource?": the owning team and the
/// evidence path that led to it.
///
/// A path of length 1 is direct ownership; longer paths walk containment
/// edges before the final owning edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipResult {
    /// The resolved owning team.
    pub owner: Node,
    /// The relations connecting the resource to its owner.
    pub path: OwnershipPath,
    /// Traversal statistics for this request.
    pub stats: TraversalStats,
}

/// One resource owned by a team, with the path that establishes
/// ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedResource {
    /// The owned node.
    pub node: Node,
    /// Representative ownership path (shortest; ties broken by
    /// lexicographic identifier sequence).
    pub path: OwnershipPath,
}

/// The answer to "what does this team own?".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedResources {
    /// The resolved team.
    pub team: Node,
    /// Every directly or transitively owned resource, deduplicated by
    /// identifier and sorted for determinism. Empty when the team owns
    /// nothing.
    pub resources: Vec<OwnedResource>,
    /// Traversal statistics for this request.
    pub stats: TraversalStats,
}

/// Statistics about a traversal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TraversalStats {
    /// Number of nodes visited.
    pub nodes_visited: usize,
    /// Number of edges fetched and examined.
    pub edges_traversed: usize,
    /// Length of the longest ownership path encountered.
    pub max_depth_reached: usize,
    /// Request execution time in milliseconds.
    pub execution_time_ms: u64,
}

impl TraversalStats {
    /// Fold another traversal's counters into this one.
    pub fn merge(&mut self, other: TraversalStats) {
        self.nodes_visited += other.nodes_visited;
        self.edges_traversed += other.edges_traversed;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
    }
}
