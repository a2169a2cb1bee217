//! External collaborator layer.
//!
//! The engine talks to its two stores and the embedding model through the
//! narrow traits in [`traits`]. Concrete adapters live beside them: an
//! embedded in-memory store, a Qdrant vector index, a SPARQL triple
//! store, and an OpenAI-compatible embedding API. Connection pooling,
//! timeouts, and retry with backoff are owned here, not by the reasoning
//! logic.

mod api;
mod memory;
mod qdrant;
mod sparql;
mod traits;

pub use api::ApiEmbeddingProvider;
pub use memory::MemoryGraphStore;
pub use qdrant::QdrantVectorIndex;
pub use sparql::{SparqlTripleStore, Vocabulary};
pub use traits::{
    EmbeddingProvider, NodeMetadataProvider, SimilarityHit, SimilaritySearchProvider,
    TriplePattern, TripleQueryProvider,
};
