//! Custodia: Ownership Resolution over a Service Knowledge Graph
//!
//! Answers "who owns this resource?" and "what does this team own?" by
//! combining semantic entity resolution (vector similarity) with exact
//! symbolic reasoning (schema-validated, cycle-safe graph traversal over
//! ownership and containment relations).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Ownership Reasoner                       │
//! │  ┌──────────────┐ ┌───────────────┐ ┌────────────────────┐   │
//! │  │   Entity     │ │   Ontology    │ │    Graph Query     │   │
//! │  │  Resolver    │ │  Validator    │ │      Engine        │   │
//! │  └──────┬───────┘ └───────┬───────┘ └─────────┬──────────┘   │
//! └─────────┼─────────────────┼───────────────────┼──────────────┘
//!           │                 │                   │
//!     vector index      node metadata        triple store
//! ```
//!
//! The stores are external collaborators behind the traits in
//! [`providers`]; an embedded in-memory implementation backs tests and
//! infrastructure-free runs.

pub mod config;
pub mod error;
pub mod graph;
pub mod ontology;
pub mod providers;
pub mod reason;
pub mod resolve;

pub use config::Config;
pub use error::{
    ConfigError, CustodiaError, EmbeddingError, GraphError, ResolutionError, Result, StoreError,
};
pub use graph::{EdgeDirection, GraphQueryEngine, NeighborEdge};
pub use ontology::{
    Candidate, Direction, Node, NodeClass, NodeId, OntologySchema, OntologyValidator,
    OwnershipPath, Relation, RelationKind,
};
pub use providers::{
    ApiEmbeddingProvider, EmbeddingProvider, MemoryGraphStore, NodeMetadataProvider,
    QdrantVectorIndex, SimilarityHit, SimilaritySearchProvider, SparqlTripleStore, TriplePattern,
    TripleQueryProvider, Vocabulary,
};
pub use reason::{
    OwnedResource, OwnedResources, OwnershipReasoner, OwnershipResult, TraversalStats,
};
pub use resolve::EntityResolver;
