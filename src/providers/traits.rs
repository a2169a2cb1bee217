//! Provider trait definitions for the external collaborators.
//!
//! The engine consumes the vector index, the triple store, and the
//! embedding model exclusively through these seams. Backends own their
//! connection pooling; the reasoning logic holds no connections itself.

use async_trait::async_trait;

use crate::error::Result;
use crate::ontology::{Node, NodeClass, NodeId, Relation, RelationKind};

/// A single hit returned by the similarity index: the matched identifier
/// plus the class and label stored alongside the vector.
#[derive(Debug, Clone)]
pub struct SimilarityHit {
    /// Identifier of the matched node.
    pub id: NodeId,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// The class recorded in the index payload.
    pub class: NodeClass,
    /// The label recorded in the index payload.
    pub label: String,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the embedding dimension.
    fn dimension(&self) -> usize;
}

/// Trait for vector similarity search backends.
#[async_trait]
pub trait SimilaritySearchProvider: Send + Sync {
    /// Search for the `top_k` nearest neighbours of `vector`, optionally
    /// restricted to nodes of the given classes.
    ///
    /// An index with nothing in it returns an empty sequence, not an
    /// error.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        class_filter: Option<&[NodeClass]>,
    ) -> Result<Vec<SimilarityHit>>;
}

/// A triple pattern with the predicate always bound and at least one of
/// subject/object bound.
///
/// Fully unbound patterns are rejected by providers: every query the
/// engine issues is anchored at a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    /// Bound subject, or `None` to match any subject.
    pub subject: Option<NodeId>,
    /// The relation kind to match.
    pub predicate: RelationKind,
    /// Bound object, or `None` to match any object.
    pub object: Option<NodeId>,
}

impl TriplePattern {
    /// Pattern matching the outgoing edges of `subject`.
    pub fn outgoing(subject: impl Into<NodeId>, predicate: RelationKind) -> Self {
        Self {
            subject: Some(subject.into()),
            predicate,
            object: None,
        }
    }

    /// Pattern matching the incoming edges of `object`.
    pub fn incoming(predicate: RelationKind, object: impl Into<NodeId>) -> Self {
        Self {
            subject: None,
            predicate,
            object: Some(object.into()),
        }
    }

    /// Whether at least one endpoint is bound.
    pub fn is_anchored(&self) -> bool {
        self.subject.is_some() || self.object.is_some()
    }
}

/// Trait for triple-pattern query backends.
#[async_trait]
pub trait TripleQueryProvider: Send + Sync {
    /// Return all relations matching the pattern.
    ///
    /// Transient failures (connectivity, timeouts) surface as
    /// [`StoreError::Unavailable`](crate::error::StoreError::Unavailable);
    /// invalid requests as
    /// [`StoreError::MalformedQuery`](crate::error::StoreError::MalformedQuery).
    async fn query(&self, pattern: &TriplePattern) -> Result<Vec<Relation>>;
}

/// Trait for node metadata lookup.
#[async_trait]
pub trait NodeMetadataProvider: Send + Sync {
    /// The class the store records for an identifier, if any.
    async fn class_of(&self, id: &NodeId) -> Result<Option<NodeClass>>;

    /// The label the store records for an identifier, if any.
    async fn label_of(&self, id: &NodeId) -> Result<Option<String>>;

    /// Exact-label lookup, bypassing the similarity stage.
    async fn find_by_label(&self, label: &str) -> Result<Option<Node>>;
}
