//! Qdrant vector index adapter.
//!
//! Wraps a remote Qdrant collection holding one point per graph node,
//! with the identifier, class, and label stored in the point payload.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{Condition, Filter, SearchPointsBuilder, Value};
use qdrant_client::Qdrant;

use crate::config::{StoresConfig, VectorStoreConfig};
use crate::error::{Result, StoreError};
use crate::ontology::NodeClass;
use crate::providers::{SimilarityHit, SimilaritySearchProvider};

/// Similarity search provider backed by a Qdrant collection.
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    retry_count: usize,
}

impl QdrantVectorIndex {
    /// Create an adapter from configuration.
    pub fn from_config(vector: &VectorStoreConfig, stores: &StoresConfig) -> Result<Self> {
        let client = Qdrant::from_url(&vector.url)
            .api_key(vector.api_key.clone())
            .timeout(stores.timeout())
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to connect to Qdrant: {e}")))?;

        Ok(Self {
            client,
            collection: vector.collection.clone(),
            retry_count: stores.retry_count,
        })
    }

    fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
        match payload.get(key)?.kind.as_ref()? {
            Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn class_filter_condition(classes: &[NodeClass]) -> Filter {
        let conditions: Vec<Condition> = classes
            .iter()
            .map(|class| Condition::matches("type", class.display_name().to_lowercase()))
            .collect();
        Filter::should(conditions)
    }
}

#[async_trait]
impl SimilaritySearchProvider for QdrantVectorIndex {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        class_filter: Option<&[NodeClass]>,
    ) -> Result<Vec<SimilarityHit>> {
        let mut last_error = StoreError::Unavailable("no attempt made".to_string());

        for attempt in 0..=self.retry_count {
            let mut builder =
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
                    .with_payload(true);
            if let Some(classes) = class_filter {
                builder = builder.filter(Self::class_filter_condition(classes));
            }

            match self.client.search_points(builder).await {
                Ok(response) => {
                    let mut hits = Vec::with_capacity(response.result.len());
                    for point in response.result {
                        let Some(uri) = Self::payload_str(&point.payload, "uri") else {
                            tracing::warn!("Qdrant point without 'uri' payload, skipping");
                            continue;
                        };
                        let Some(class) = Self::payload_str(&point.payload, "type")
                            .and_then(|t| t.parse::<NodeClass>().ok())
                        else {
                            tracing::warn!("Qdrant point {} without usable 'type', skipping", uri);
                            continue;
                        };
                        let label = Self::payload_str(&point.payload, "label")
                            .unwrap_or_else(|| uri.clone());

                        hits.push(SimilarityHit {
                            id: uri.into(),
                            score: point.score.clamp(0.0, 1.0),
                            class,
                            label,
                        });
                    }
                    return Ok(hits);
                }
                Err(e) => {
                    last_error = StoreError::Unavailable(format!("Qdrant search failed: {e}"));
                }
            }

            if attempt < self.retry_count {
                let delay = Duration::from_millis(100 * 2u64.pow(attempt as u32));
                tracing::warn!(
                    "Vector search failed (attempt {}): {} - retrying in {:?}",
                    attempt + 1,
                    last_error,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.into())
    }
}
