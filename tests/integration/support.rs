//! Shared fixtures for the integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use custodia::{
    Config, EmbeddingProvider, MemoryGraphStore, Node, NodeClass, NodeId, OwnershipReasoner,
    Relation, RelationKind, Result,
};

/// Embedder returning fixed vectors for known phrases and a zero vector
/// (matching nothing) otherwise.
pub struct StaticEmbedder {
    map: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl StaticEmbedder {
    pub fn with(dimension: usize, entries: &[(&str, Vec<f32>)]) -> Arc<Self> {
        let map = entries
            .iter()
            .map(|(phrase, vector)| (phrase.to_string(), vector.clone()))
            .collect();
        Arc::new(Self { map, dimension })
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self
            .map
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension]))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Add a team node; the identifier is `urn:team/<slug>`.
pub fn team(store: &MemoryGraphStore, slug: &str) -> NodeId {
    let id = NodeId::new(format!("urn:team/{slug}"));
    store.insert_node(Node::new(id.clone(), NodeClass::Team, format!("Team {slug}")));
    id
}

/// Add a service node; the identifier is `urn:svc/<slug>`.
pub fn service(store: &MemoryGraphStore, slug: &str) -> NodeId {
    let id = NodeId::new(format!("urn:svc/{slug}"));
    store.insert_node(Node::new(id.clone(), NodeClass::Service, slug));
    id
}

/// Add an endpoint node; the identifier is `urn:ep/<slug>`.
pub fn endpoint(store: &MemoryGraphStore, slug: &str, label: &str) -> NodeId {
    let id = NodeId::new(format!("urn:ep/{slug}"));
    store.insert_node(Node::new(id.clone(), NodeClass::Endpoint, label));
    id
}

pub fn owns(store: &MemoryGraphStore, team: &NodeId, resource: &NodeId) {
    store
        .insert_relation(Relation::new(
            team.clone(),
            RelationKind::OwnsDirectly,
            resource.clone(),
        ))
        .expect("owns relation must satisfy the schema");
}

pub fn part_of(store: &MemoryGraphStore, child: &NodeId, parent: &NodeId) {
    store
        .insert_relation(Relation::new(
            child.clone(),
            RelationKind::PartOf,
            parent.clone(),
        ))
        .expect("part_of relation must satisfy the schema");
}

pub fn embed_node(store: &MemoryGraphStore, id: &NodeId, vector: Vec<f32>) {
    store
        .insert_embedding(id, vector)
        .expect("node must exist before indexing its embedding");
}

/// Wire a reasoner over the store with the given embedder and config.
pub fn reasoner(
    store: &Arc<MemoryGraphStore>,
    embedder: Arc<StaticEmbedder>,
    config: &Config,
) -> OwnershipReasoner {
    OwnershipReasoner::from_providers(
        embedder,
        store.clone(),
        store.clone(),
        store.clone(),
        config,
    )
}
