//! Error types for the custodia ownership engine.
//!
//! The taxonomy mirrors how callers are expected to react: reference
//! errors go back to the user for a refined query, graph-integrity errors
//! indicate bad data, store errors may be retried, and cancellation is
//! always final.

use thiserror::Error;

use crate::ontology::{Candidate, NodeClass, NodeId, RelationKind};

/// Main error type for custodia operations.
#[derive(Error, Debug)]
pub enum CustodiaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CustodiaError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Reference and graph-integrity errors are deterministic; only
    /// transient infrastructure failures qualify. Cancellation is never
    /// retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CustodiaError::Store(StoreError::Unavailable(_))
                | CustodiaError::Embedding(EmbeddingError::RateLimited)
        )
    }
}

/// Configuration-related errors, raised at startup only.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors produced while resolving a text reference to a graph node.
///
/// These are expected outcomes of fuzzy resolution and carry enough
/// context for the caller to retry with a refined reference.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("no entity matched '{reference}'")]
    NotFound { reference: String },

    #[error(
        "ambiguous reference '{reference}': {count} candidates within the ambiguity margin",
        count = .candidates.len()
    )]
    Ambiguous {
        reference: String,
        /// Every candidate whose score is within the margin of the top
        /// score, in rank order, so the caller can disambiguate.
        candidates: Vec<Candidate>,
    },
}

/// Graph-semantic errors. Deterministic, never retried.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error(
        "entity {node} is not typed as one of {required:?} (found: {found})",
        found = .actual.map(|c| c.display_name()).unwrap_or("none")
    )]
    TypeMismatch {
        node: NodeId,
        /// The class recorded in the store, if the node is typed at all.
        actual: Option<NodeClass>,
        required: Vec<NodeClass>,
    },

    #[error("containment cycle detected at {0}")]
    CycleDetected(NodeId),

    #[error("no owner found for '{reference}' after exploring {paths_explored} containment paths")]
    NoOwnerFound {
        reference: String,
        paths_explored: usize,
    },

    #[error("relation violates ontology schema: {subject} -[{predicate}]-> {object}")]
    SchemaViolation {
        subject: NodeId,
        predicate: RelationKind,
        object: NodeId,
    },

    #[error("traversal depth limit {max_depth} reached at {node} with edges left to expand")]
    DepthExceeded { node: NodeId, max_depth: usize },
}

/// Errors from the external triple and vector stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transient failure (connection refused, 5xx, timeout). Eligible for
    /// bounded retries at the collaborator boundary.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Permanent failure: the request itself is wrong. Never retried.
    #[error("malformed query: {0}")]
    MalformedQuery(String),
}

/// Embedding-provider errors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Result type alias for custodia operations.
pub type Result<T> = std::result::Result<T, CustodiaError>;
