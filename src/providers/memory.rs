//! Embedded in-memory graph store.
//!
//! Backs all three graph-side provider traits with indexed hash maps
//! behind a single lock. Used for tests and for running the engine
//! without external infrastructure; the population step enforces the
//! ontology schema so integrity violations are caught at load time.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{GraphError, Result, StoreError};
use crate::ontology::{Node, NodeClass, NodeId, OntologySchema, Relation};
use crate::providers::{
    NodeMetadataProvider, SimilarityHit, SimilaritySearchProvider, TriplePattern,
    TripleQueryProvider,
};

/// Internal data storage structure.
#[derive(Debug, Default)]
struct GraphData {
    /// Nodes indexed by identifier.
    nodes: HashMap<NodeId, Node>,
    /// All relations, in insertion order.
    relations: Vec<Relation>,
    /// Index: subject -> relation positions.
    rel_by_subject: HashMap<NodeId, Vec<usize>>,
    /// Index: object -> relation positions.
    rel_by_object: HashMap<NodeId, Vec<usize>>,
    /// Index: exact label -> identifier.
    by_label: HashMap<String, NodeId>,
    /// Embedding vectors indexed by identifier.
    vectors: HashMap<NodeId, Vec<f32>>,
}

/// In-memory graph store implementing the triple, metadata, and
/// similarity provider traits.
pub struct MemoryGraphStore {
    schema: OntologySchema,
    data: RwLock<GraphData>,
}

impl MemoryGraphStore {
    /// Create an empty store using the standard ownership schema.
    pub fn new() -> Self {
        Self {
            schema: OntologySchema::standard(),
            data: RwLock::new(GraphData::default()),
        }
    }

    /// Insert a node, replacing any previous node with the same id.
    pub fn insert_node(&self, node: Node) {
        let mut data = self.data.write();
        data.by_label.insert(node.label.clone(), node.id.clone());
        data.nodes.insert(node.id.clone(), node);
    }

    /// Insert a relation.
    ///
    /// Both endpoints must already be present and their classes must be
    /// permitted by the schema for the relation kind; violations are
    /// reported, never dropped.
    pub fn insert_relation(&self, relation: Relation) -> Result<()> {
        let mut data = self.data.write();

        let subject_class = data.nodes.get(&relation.subject).map(|n| n.class);
        let object_class = data.nodes.get(&relation.object).map(|n| n.class);
        let valid = match (subject_class, object_class) {
            (Some(s), Some(o)) => self.schema.is_valid_relation(relation.predicate, s, o),
            _ => false,
        };
        if !valid {
            return Err(GraphError::SchemaViolation {
                subject: relation.subject.clone(),
                predicate: relation.predicate,
                object: relation.object.clone(),
            }
            .into());
        }

        let idx = data.relations.len();
        data.rel_by_subject
            .entry(relation.subject.clone())
            .or_default()
            .push(idx);
        data.rel_by_object
            .entry(relation.object.clone())
            .or_default()
            .push(idx);
        data.relations.push(relation);
        Ok(())
    }

    /// Attach an embedding vector to an existing node.
    pub fn insert_embedding(&self, id: &NodeId, vector: Vec<f32>) -> Result<()> {
        let mut data = self.data.write();
        if !data.nodes.contains_key(id) {
            return Err(StoreError::MalformedQuery(format!(
                "cannot index embedding for unknown node {id}"
            ))
            .into());
        }
        data.vectors.insert(id.clone(), vector);
        Ok(())
    }

    /// Number of nodes in the store.
    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }

    /// Number of relations in the store.
    pub fn relation_count(&self) -> usize {
        self.data.read().relations.len()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TripleQueryProvider for MemoryGraphStore {
    async fn query(&self, pattern: &TriplePattern) -> Result<Vec<Relation>> {
        if !pattern.is_anchored() {
            return Err(StoreError::MalformedQuery(
                "triple pattern must bind subject or object".to_string(),
            )
            .into());
        }

        let data = self.data.read();
        let positions: Vec<usize> = match (&pattern.subject, &pattern.object) {
            (Some(subject), _) => data
                .rel_by_subject
                .get(subject)
                .cloned()
                .unwrap_or_default(),
            (None, Some(object)) => data.rel_by_object.get(object).cloned().unwrap_or_default(),
            (None, None) => unreachable!("anchored pattern"),
        };

        let mut matches: Vec<Relation> = positions
            .into_iter()
            .map(|i| data.relations[i].clone())
            .filter(|rel| rel.predicate == pattern.predicate)
            .filter(|rel| {
                pattern
                    .object
                    .as_ref()
                    .is_none_or(|object| &rel.object == object)
            })
            .collect();

        matches.sort_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then_with(|| a.object.cmp(&b.object))
        });
        matches.dedup();
        Ok(matches)
    }
}

#[async_trait]
impl NodeMetadataProvider for MemoryGraphStore {
    async fn class_of(&self, id: &NodeId) -> Result<Option<NodeClass>> {
        Ok(self.data.read().nodes.get(id).map(|n| n.class))
    }

    async fn label_of(&self, id: &NodeId) -> Result<Option<String>> {
        Ok(self.data.read().nodes.get(id).map(|n| n.label.clone()))
    }

    async fn find_by_label(&self, label: &str) -> Result<Option<Node>> {
        let data = self.data.read();
        Ok(data
            .by_label
            .get(label)
            .and_then(|id| data.nodes.get(id))
            .cloned())
    }
}

#[async_trait]
impl SimilaritySearchProvider for MemoryGraphStore {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        class_filter: Option<&[NodeClass]>,
    ) -> Result<Vec<SimilarityHit>> {
        let data = self.data.read();

        let mut hits: Vec<SimilarityHit> = data
            .vectors
            .iter()
            .filter_map(|(id, stored)| {
                let node = data.nodes.get(id)?;
                if let Some(classes) = class_filter {
                    if !classes.contains(&node.class) {
                        return None;
                    }
                }
                let score = Self::cosine_similarity(vector, stored).clamp(0.0, 1.0);
                Some(SimilarityHit {
                    id: id.clone(),
                    score,
                    class: node.class,
                    label: node.label.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}
