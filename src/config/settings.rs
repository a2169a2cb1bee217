//! Configuration settings for the custodia engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration structure.
///
/// Injected explicitly into the collaborator constructors; there is no
/// hidden global state inside the reasoning logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub traversal: TraversalConfig,
    pub stores: StoresConfig,
    pub vector: VectorStoreConfig,
    pub triple: TripleStoreConfig,
    pub embedding: EmbeddingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("custodia.toml"),
            dirs::config_dir()
                .map(|p| p.join("custodia/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".custodia/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    ///
    /// Bad values are a startup error, never a per-request failure.
    fn validate(&self) -> Result<()> {
        if self.resolver.top_k == 0 {
            return Err(ConfigError::Invalid("resolver.top_k must be > 0".to_string()).into());
        }
        if !(0.0..=1.0).contains(&self.resolver.min_score) {
            return Err(
                ConfigError::Invalid("resolver.min_score must be in [0, 1]".to_string()).into(),
            );
        }
        if !(0.0..=1.0).contains(&self.resolver.ambiguity_margin) {
            return Err(ConfigError::Invalid(
                "resolver.ambiguity_margin must be in [0, 1]".to_string(),
            )
            .into());
        }
        if self.traversal.max_depth == 0 {
            return Err(ConfigError::Invalid("traversal.max_depth must be > 0".to_string()).into());
        }
        if self.traversal.max_concurrent_branches == 0 {
            return Err(ConfigError::Invalid(
                "traversal.max_concurrent_branches must be > 0".to_string(),
            )
            .into());
        }
        if self.stores.timeout_secs == 0 {
            return Err(ConfigError::Invalid("stores.timeout_secs must be > 0".to_string()).into());
        }
        if self.vector.url.is_empty() {
            return Err(ConfigError::MissingField("vector.url".to_string()).into());
        }
        if self.vector.collection.is_empty() {
            return Err(ConfigError::MissingField("vector.collection".to_string()).into());
        }
        if self.triple.query_url.is_empty() {
            return Err(ConfigError::MissingField("triple.query_url".to_string()).into());
        }
        if self.triple.namespace.is_empty() {
            return Err(ConfigError::MissingField("triple.namespace".to_string()).into());
        }
        if self.embedding.base_url.is_empty() {
            return Err(ConfigError::MissingField("embedding.base_url".to_string()).into());
        }
        if self.embedding.model.is_empty() {
            return Err(ConfigError::MissingField("embedding.model".to_string()).into());
        }
        Ok(())
    }
}

/// Entity-resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Number of candidates requested from the similarity index.
    pub top_k: usize,
    /// Candidates scoring below this threshold are dropped.
    pub min_score: f32,
    /// Score gap below which the top candidates are considered tied and
    /// the reference must be disambiguated by the caller.
    pub ambiguity_margin: f32,
    /// Candidate cache settings.
    pub cache: CacheConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.3,
            ambiguity_margin: 0.05,
            cache: CacheConfig::default(),
        }
    }
}

/// Bounded, TTL-based cache for resolution results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the resolver caches ranked candidate lists.
    pub enabled: bool,
    /// Maximum number of cached entries.
    pub capacity: u64,
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1024,
            ttl_secs: 300,
        }
    }
}

/// Graph-traversal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Maximum ownership-path length. Traversals never exceed this
    /// ceiling; running into it is reported, not silently truncated.
    pub max_depth: usize,
    /// Concurrency limit for independent traversal branches.
    pub max_concurrent_branches: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_concurrent_branches: 4,
        }
    }
}

/// Shared settings for external store calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresConfig {
    /// Per-call timeout in seconds. Timeouts surface as transient store
    /// failures.
    pub timeout_secs: u64,
    /// Number of retries for transient failures at the collaborator
    /// boundary.
    pub retry_count: usize,
}

impl StoresConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retry_count: 3,
        }
    }
}

/// Vector-index collaborator configuration (Qdrant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Qdrant gRPC URL.
    pub url: String,
    /// Collection holding entity embeddings.
    pub collection: String,
    /// Optional API key.
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "ontology_entities".to_string(),
            api_key: None,
        }
    }
}

/// Triple-store collaborator configuration (SPARQL over HTTP).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TripleStoreConfig {
    /// SPARQL query endpoint URL.
    pub query_url: String,
    /// Namespace prefix for ontology classes and predicates.
    pub namespace: String,
    /// Optional basic-auth username.
    pub username: Option<String>,
    /// Optional basic-auth password.
    pub password: Option<String>,
}

impl Default for TripleStoreConfig {
    fn default() -> Self {
        Self {
            query_url: "http://localhost:3030/ontology/query".to_string(),
            namespace: "http://example.org/voc/".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Embedding-provider configuration (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL for the embedding API.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// API key (loaded from environment if not set).
    pub api_key: Option<String>,
    /// Embedding vector dimension.
    pub dimension: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            dimension: 768,
            timeout_secs: 30,
        }
    }
}
