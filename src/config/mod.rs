//! Configuration loading and validation.

mod settings;

pub use settings::{
    CacheConfig, Config, EmbeddingConfig, ResolverConfig, StoresConfig, TraversalConfig,
    TripleStoreConfig, VectorStoreConfig,
};
