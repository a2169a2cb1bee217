//! Class validation for resolved graph nodes.
//!
//! Candidates arrive from the similarity index with a class recorded in
//! the vector payload; the validator re-checks the class against the
//! authoritative triple store before any traversal begins, so an out of
//! date index cannot send the reasoner down the wrong branch.

use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::ontology::{Node, NodeClass, NodeId};
use crate::providers::NodeMetadataProvider;

/// Validates node classes against the metadata recorded in the store.
///
/// Deterministic: the same node and requirement always produce the same
/// outcome, so failures are never retried.
pub struct OntologyValidator {
    metadata: Arc<dyn NodeMetadataProvider>,
}

impl OntologyValidator {
    /// Create a new validator over a metadata provider.
    pub fn new(metadata: Arc<dyn NodeMetadataProvider>) -> Self {
        Self { metadata }
    }

    /// Look up the class the store records for an identifier.
    pub async fn class_of(&self, id: &NodeId) -> Result<Option<NodeClass>> {
        self.metadata.class_of(id).await
    }

    /// Check that the store types `node` as one of `required`.
    ///
    /// Fails with [`GraphError::TypeMismatch`] naming the node, the class
    /// actually found (if any), and the required classes, so callers can
    /// pick a different candidate and try again.
    pub async fn validate(&self, node: &Node, required: &[NodeClass]) -> Result<()> {
        let actual = self.metadata.class_of(&node.id).await?;
        match actual {
            Some(class) if required.contains(&class) => Ok(()),
            actual => Err(GraphError::TypeMismatch {
                node: node.id.clone(),
                actual,
                required: required.to_vec(),
            }
            .into()),
        }
    }
}
