//! Infrastructure failure handling: outages, timeouts, cancellation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use custodia::{
    Config, CustodiaError, MemoryGraphStore, OntologyValidator, OwnershipReasoner, Relation,
    Result, StoreError, TriplePattern, TripleQueryProvider,
};
use custodia::{EntityResolver, GraphQueryEngine};

use crate::support::{self, StaticEmbedder};

const E_CHECKOUT: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Triple provider standing in for a store that is down.
struct DownTripleStore;

#[async_trait]
impl TripleQueryProvider for DownTripleStore {
    async fn query(&self, _pattern: &TriplePattern) -> Result<Vec<Relation>> {
        Err(StoreError::Unavailable("connection refused".to_string()).into())
    }
}

/// Triple provider that never answers.
struct HangingTripleStore;

#[async_trait]
impl TripleQueryProvider for HangingTripleStore {
    async fn query(&self, _pattern: &TriplePattern) -> Result<Vec<Relation>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

fn seeded_store() -> Arc<MemoryGraphStore> {
    let store = Arc::new(MemoryGraphStore::new());
    let alpha = support::team(&store, "alpha");
    let checkout = support::service(&store, "checkout-service");
    support::owns(&store, &alpha, &checkout);
    support::embed_node(&store, &checkout, E_CHECKOUT.to_vec());
    store
}

fn embedder() -> Arc<StaticEmbedder> {
    StaticEmbedder::with(4, &[("checkout", E_CHECKOUT.to_vec())])
}

/// Reasoner whose traversal runs against the given triple provider while
/// resolution still uses the healthy in-memory index.
fn reasoner_with_triples(
    store: &Arc<MemoryGraphStore>,
    triples: Arc<dyn TripleQueryProvider>,
    config: &Config,
) -> OwnershipReasoner {
    let resolver = Arc::new(EntityResolver::new(
        embedder(),
        store.clone(),
        store.clone(),
        config,
    ));
    let validator = Arc::new(OntologyValidator::new(store.clone()));
    let graph = Arc::new(GraphQueryEngine::new(triples, store.clone(), config));
    OwnershipReasoner::new(resolver, validator, graph, store.clone(), config)
}

#[tokio::test]
async fn store_outage_surfaces_as_retryable_unavailable() {
    let store = seeded_store();
    let reasoner = reasoner_with_triples(&store, Arc::new(DownTripleStore), &Config::default());

    let err = reasoner.find_owner("checkout").await.unwrap_err();
    assert!(matches!(
        err,
        CustodiaError::Store(StoreError::Unavailable(_))
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn store_timeout_surfaces_as_unavailable() {
    let store = seeded_store();
    let mut config = Config::default();
    config.stores.timeout_secs = 1;
    let reasoner = reasoner_with_triples(&store, Arc::new(HangingTripleStore), &config);

    let err = reasoner.find_owner("checkout").await.unwrap_err();
    match err {
        CustodiaError::Store(StoreError::Unavailable(message)) => {
            assert!(message.contains("timed out"));
        }
        other => panic!("expected Unavailable, got {other}"),
    }
}

#[tokio::test]
async fn cancellation_is_propagated_not_retried() {
    let store = seeded_store();
    let reasoner = support::reasoner(&store, embedder(), &Config::default());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = reasoner
        .find_owner_cancellable("checkout", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CustodiaError::Cancelled));
    assert!(!err.is_retryable());

    let err = reasoner
        .find_owned_resources_cancellable("checkout", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CustodiaError::Cancelled));
}

#[tokio::test]
async fn concurrent_requests_share_the_engine_safely() {
    let store = seeded_store();
    let reasoner = Arc::new(support::reasoner(&store, embedder(), &Config::default()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let reasoner = reasoner.clone();
        handles.push(tokio::spawn(async move {
            reasoner.find_owner("checkout").await
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.path.len(), 1);
    }
}
