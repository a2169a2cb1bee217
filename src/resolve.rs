//! Entity resolution: free text to ranked graph-node candidates.
//!
//! The resolver embeds the query, searches the vector index, filters by
//! class and minimum score, and produces a deterministically ordered
//! candidate list. "Not found" is signalled by an empty list, letting the
//! caller decide how to react.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{CustodiaError, Result, StoreError};
use crate::ontology::{Candidate, Node, NodeClass};
use crate::providers::{EmbeddingProvider, NodeMetadataProvider, SimilaritySearchProvider};

/// Cache key for ranked candidate lists.
///
/// Keyed by the normalized query text plus the class filter; the cache is
/// bounded and TTL-based, never invalidated (the graph is read-mostly and
/// candidates are transient by design).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    classes: Vec<NodeClass>,
}

impl CacheKey {
    fn new(query: &str, class_filter: Option<&[NodeClass]>) -> Self {
        let mut classes = class_filter.map(|c| c.to_vec()).unwrap_or_default();
        classes.sort();
        Self {
            query: query.trim().to_lowercase(),
            classes,
        }
    }
}

/// Resolves text references to ranked candidate nodes via similarity
/// search.
pub struct EntityResolver {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilaritySearchProvider>,
    metadata: Arc<dyn NodeMetadataProvider>,
    top_k: usize,
    min_score: f32,
    store_timeout: Duration,
    cache: Option<Cache<CacheKey, Arc<Vec<Candidate>>>>,
}

impl EntityResolver {
    /// Create a resolver over the given providers.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilaritySearchProvider>,
        metadata: Arc<dyn NodeMetadataProvider>,
        config: &Config,
    ) -> Self {
        let cache_config = &config.resolver.cache;
        let cache = if cache_config.enabled {
            Some(
                Cache::builder()
                    .max_capacity(cache_config.capacity)
                    .time_to_live(Duration::from_secs(cache_config.ttl_secs))
                    .build(),
            )
        } else {
            None
        };

        Self {
            embedder,
            index,
            metadata,
            top_k: config.resolver.top_k,
            min_score: config.resolver.min_score,
            store_timeout: config.stores.timeout(),
            cache,
        }
    }

    /// Resolve a text reference to ranked candidates.
    ///
    /// Candidates are ordered by descending score, ties broken by
    /// lexicographic identifier order. Candidates scoring below the
    /// configured minimum are dropped; an empty result is `Ok`, not an
    /// error.
    pub async fn resolve(
        &self,
        query: &str,
        class_filter: Option<&[NodeClass]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        if cancel.is_cancelled() {
            return Err(CustodiaError::Cancelled);
        }

        let key = CacheKey::new(query, class_filter);
        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get(&key).await {
                tracing::debug!("resolver cache hit for '{}'", query);
                return Ok((*cached).clone());
            }
        }

        let vector = self.with_timeout(self.embedder.embed(query)).await?;
        if cancel.is_cancelled() {
            return Err(CustodiaError::Cancelled);
        }

        // Over-fetch when a class filter is set so post-filtering can
        // still fill top_k.
        let fetch = if class_filter.is_some() {
            self.top_k * 4
        } else {
            self.top_k
        };
        let hits = self
            .with_timeout(self.index.search(&vector, fetch, class_filter))
            .await?;

        let mut candidates: Vec<Candidate> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.min_score)
            .filter(|hit| class_filter.is_none_or(|classes| classes.contains(&hit.class)))
            .map(|hit| Candidate::new(Node::new(hit.id, hit.class, hit.label), hit.score, 0))
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node.id.cmp(&b.node.id))
        });
        candidates.truncate(self.top_k);
        for (rank, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = rank;
        }

        tracing::debug!(
            "resolved '{}' to {} candidates (filter: {:?})",
            query,
            candidates.len(),
            class_filter
        );

        if let Some(ref cache) = self.cache {
            cache.insert(key, Arc::new(candidates.clone())).await;
        }

        Ok(candidates)
    }

    /// Exact-label lookup, bypassing the similarity stage.
    ///
    /// Fast path for callers that already hold a precise name.
    pub async fn resolve_exact(
        &self,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Node>> {
        if cancel.is_cancelled() {
            return Err(CustodiaError::Cancelled);
        }
        self.with_timeout(self.metadata.find_by_label(label)).await
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
