//! Core types for the ownership knowledge graph.
//!
//! Nodes and relations are plain data keyed by identifier. They are
//! produced by the external bootstrap process and are read-only to the
//! engine; traversal never mutates the graph.

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque, globally unique identifier (IRI) naming a graph node.
///
/// Identifiers are immutable once assigned. `Ord` is derived so that every
/// tie-break in the engine can fall back to lexicographic identifier order
/// and stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new identifier.
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Node Classes
// ============================================================================

/// The ontology class of a graph node.
///
/// The class set is closed: validation is table-driven over this
/// enumeration rather than inspecting runtime type information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// An owning team. Teams own resources and are never owned.
    Team,
    /// A deployable service.
    Service,
    /// An API endpoint, contained in a service.
    Endpoint,
    /// A datastore (database, queue, bucket).
    Datastore,
    /// A generic resource not covered by a more specific class.
    Resource,
}

impl NodeClass {
    /// All classes known to the ontology.
    pub fn all() -> &'static [NodeClass] {
        &[
            NodeClass::Team,
            NodeClass::Service,
            NodeClass::Endpoint,
            NodeClass::Datastore,
            NodeClass::Resource,
        ]
    }

    /// Every ownable class, i.e. everything except `Team`.
    pub fn ownable() -> &'static [NodeClass] {
        &[
            NodeClass::Service,
            NodeClass::Endpoint,
            NodeClass::Datastore,
            NodeClass::Resource,
        ]
    }

    /// Check whether this is the team class.
    pub fn is_team(&self) -> bool {
        matches!(self, NodeClass::Team)
    }

    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeClass::Team => "Team",
            NodeClass::Service => "Service",
            NodeClass::Endpoint => "Endpoint",
            NodeClass::Datastore => "Datastore",
            NodeClass::Resource => "Resource",
        }
    }
}

impl std::fmt::Display for NodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for NodeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "team" => Ok(NodeClass::Team),
            "service" => Ok(NodeClass::Service),
            "endpoint" => Ok(NodeClass::Endpoint),
            "datastore" => Ok(NodeClass::Datastore),
            "resource" => Ok(NodeClass::Resource),
            _ => Err(format!(
                "Unknown node class: '{}'. Valid classes: team, service, endpoint, datastore, resource",
                s
            )),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A node in the ownership graph: identifier, declared class, and a
/// human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for the node.
    pub id: NodeId,
    /// The declared ontology class.
    pub class: NodeClass,
    /// Human-readable label.
    pub label: String,
}

impl Node {
    /// Create a new node.
    pub fn new(id: impl Into<NodeId>, class: NodeClass, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class,
            label: label.into(),
        }
    }
}

// ============================================================================
// Relations
// ============================================================================

/// The kind of a directed relation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// A team directly owns a resource-like node. The team is always the
    /// subject; team nodes are never owned.
    OwnsDirectly,
    /// The subject is structurally part of the object (containee to
    /// container, e.g. an endpoint part of a service).
    PartOf,
    /// A non-ownership dependency. Present in the graph, excluded from
    /// ownership reasoning.
    Uses,
}

impl RelationKind {
    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            RelationKind::OwnsDirectly => "owns directly",
            RelationKind::PartOf => "part of",
            RelationKind::Uses => "uses",
        }
    }

    /// All relation kinds known to the ontology.
    pub fn all() -> &'static [RelationKind] {
        &[
            RelationKind::OwnsDirectly,
            RelationKind::PartOf,
            RelationKind::Uses,
        ]
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owns_directly" | "ownsdirectly" => Ok(RelationKind::OwnsDirectly),
            "part_of" | "partof" => Ok(RelationKind::PartOf),
            "uses" => Ok(RelationKind::Uses),
            _ => Err(format!(
                "Unknown relation kind: '{}'. Valid kinds: owns_directly, part_of, uses",
                s
            )),
        }
    }
}

/// A directed, typed edge in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    /// Source node of the edge.
    pub subject: NodeId,
    /// Edge type.
    pub predicate: RelationKind,
    /// Target node of the edge.
    pub object: NodeId,
}

impl Relation {
    /// Create a new relation.
    pub fn new(
        subject: impl Into<NodeId>,
        predicate: RelationKind,
        object: impl Into<NodeId>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.subject, self.predicate, self.object)
    }
}

/// Direction of a traversal along a relation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow edges from subject to object.
    Forward,
    /// Follow edges from object to subject.
    Backward,
}

// ============================================================================
// Ownership Paths
// ============================================================================

/// An ordered sequence of relations connecting a resource to its resolved
/// owner (or a team to a transitively owned resource).
///
/// Doubles as the answer's evidence and as the cycle guard: a node must
/// not repeat within a single path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipPath {
    /// The relations along the path, in traversal order.
    pub relations: Vec<Relation>,
}

impl OwnershipPath {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a path from a list of relations.
    pub fn from_relations(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    /// Append one relation to the path.
    pub fn push(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// Number of relations in the path.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Whether the path holds no relations.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Whether a node already appears on this path, as either endpoint of
    /// any relation.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.relations
            .iter()
            .any(|rel| &rel.subject == id || &rel.object == id)
    }

    /// The identifiers along the path, in order of appearance. Used for
    /// deterministic tie-breaking between equal-length paths.
    pub fn id_sequence(&self) -> Vec<&NodeId> {
        let mut ids: Vec<&NodeId> = Vec::with_capacity(self.relations.len() * 2);
        for rel in &self.relations {
            if ids.last() != Some(&&rel.subject) {
                ids.push(&rel.subject);
            }
            ids.push(&rel.object);
        }
        ids
    }
}

impl std::fmt::Display for OwnershipPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: Vec<String> = self.relations.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", steps.join(", "))
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// A candidate node produced by similarity search.
///
/// Transient: created per resolution request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// The matched node.
    pub node: Node,
    /// Similarity score in `[0, 1]`, higher is closer.
    pub score: f32,
    /// Zero-based position in the ranked result sequence.
    pub rank: usize,
}

impl Candidate {
    /// Create a new candidate.
    pub fn new(node: Node, score: f32, rank: usize) -> Self {
        Self { node, score, rank }
    }
}
