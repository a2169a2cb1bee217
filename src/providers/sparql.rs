//! SPARQL-over-HTTP triple store adapter.
//!
//! Speaks the SPARQL protocol (form-encoded query, JSON results) against
//! an endpoint such as Apache Fuseki. Transient failures are retried with
//! exponential backoff here at the collaborator boundary; the reasoning
//! algorithms above never retry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{StoresConfig, TripleStoreConfig};
use crate::error::{Result, StoreError};
use crate::ontology::{Node, NodeClass, NodeId, Relation, RelationKind};
use crate::providers::{NodeMetadataProvider, TriplePattern, TripleQueryProvider};

const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

// ============================================================================
// Vocabulary
// ============================================================================

/// Maps the closed class and relation vocabulary to IRIs under the
/// configured namespace.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    namespace: String,
}

impl Vocabulary {
    /// Create a vocabulary rooted at `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// IRI for a relation kind.
    pub fn predicate_iri(&self, kind: RelationKind) -> String {
        let local = match kind {
            RelationKind::OwnsDirectly => "ownsDirectly",
            RelationKind::PartOf => "partOf",
            RelationKind::Uses => "uses",
        };
        format!("{}{}", self.namespace, local)
    }

    /// IRI for a node class.
    pub fn class_iri(&self, class: NodeClass) -> String {
        format!("{}{}", self.namespace, class.display_name())
    }

    /// Parse a class from its IRI, if it belongs to this vocabulary.
    pub fn class_from_iri(&self, iri: &str) -> Option<NodeClass> {
        let local = iri.strip_prefix(&self.namespace)?;
        match local {
            "Team" => Some(NodeClass::Team),
            "Service" => Some(NodeClass::Service),
            "Endpoint" => Some(NodeClass::Endpoint),
            "Datastore" => Some(NodeClass::Datastore),
            "Resource" => Some(NodeClass::Resource),
            _ => None,
        }
    }
}

// ============================================================================
// SPARQL JSON result format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    #[serde(default)]
    boolean: Option<bool>,
    #[serde(default)]
    results: Option<SparqlResults>,
}

#[derive(Debug, Default, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

impl SparqlResponse {
    fn bindings(self) -> Vec<HashMap<String, SparqlTerm>> {
        self.results.unwrap_or_default().bindings
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Triple-pattern and metadata provider backed by a SPARQL endpoint.
pub struct SparqlTripleStore {
    client: Client,
    query_url: String,
    vocabulary: Vocabulary,
    username: Option<String>,
    password: Option<String>,
    retry_count: usize,
}

impl SparqlTripleStore {
    /// Create an adapter from configuration.
    pub fn from_config(triple: &TripleStoreConfig, stores: &StoresConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(stores.timeout())
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            query_url: triple.query_url.clone(),
            vocabulary: Vocabulary::new(triple.namespace.clone()),
            username: triple.username.clone(),
            password: triple.password.clone(),
            retry_count: stores.retry_count,
        })
    }

    /// The vocabulary used for IRI mapping.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Execute a SPARQL query, retrying transient failures with
    /// exponential backoff.
    async fn execute(&self, sparql: &str) -> Result<SparqlResponse> {
        let mut last_error = StoreError::Unavailable("no attempt made".to_string());

        for attempt in 0..=self.retry_count {
            let mut request = self
                .client
                .post(&self.query_url)
                .header("Accept", "application/sparql-results+json")
                .form(&[("query", sparql)]);

            if let Some(ref username) = self.username {
                request = request.basic_auth(username, self.password.as_deref());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<SparqlResponse>().await.map_err(|e| {
                            StoreError::Unavailable(format!("invalid SPARQL response: {e}")).into()
                        });
                    }
                    if status.is_client_error() {
                        // The request itself is wrong; retrying cannot help.
                        let body = response.text().await.unwrap_or_default();
                        return Err(
                            StoreError::MalformedQuery(format!("{status}: {body}")).into()
                        );
                    }
                    last_error = StoreError::Unavailable(format!("server error: {status}"));
                }
                Err(e) => {
                    last_error = if e.is_timeout() {
                        StoreError::Unavailable("request timed out".to_string())
                    } else {
                        StoreError::Unavailable(format!("request failed: {e}"))
                    };
                }
            }

            if attempt < self.retry_count {
                let delay = Duration::from_millis(100 * 2u64.pow(attempt as u32));
                tracing::warn!(
                    "SPARQL query failed (attempt {}): {} - retrying in {:?}",
                    attempt + 1,
                    last_error,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.into())
    }

    fn escape_literal(value: &str) -> String {
        value.replace('\\', "\\\\").replace('"', "\\\"")
    }
}

#[async_trait]
impl TripleQueryProvider for SparqlTripleStore {
    async fn query(&self, pattern: &TriplePattern) -> Result<Vec<Relation>> {
        if !pattern.is_anchored() {
            return Err(StoreError::MalformedQuery(
                "triple pattern must bind subject or object".to_string(),
            )
            .into());
        }

        let predicate = self.vocabulary.predicate_iri(pattern.predicate);

        match (&pattern.subject, &pattern.object) {
            (Some(subject), Some(object)) => {
                let sparql = format!("ASK {{ <{subject}> <{predicate}> <{object}> }}");
                let response = self.execute(&sparql).await?;
                if response.boolean.unwrap_or(false) {
                    Ok(vec![Relation::new(
                        subject.clone(),
                        pattern.predicate,
                        object.clone(),
                    )])
                } else {
                    Ok(Vec::new())
                }
            }
            (Some(subject), None) => {
                let sparql = format!(
                    "SELECT ?object WHERE {{ <{subject}> <{predicate}> ?object . \
                     FILTER(isIRI(?object)) }}"
                );
                let response = self.execute(&sparql).await?;
                Ok(response
                    .bindings()
                    .into_iter()
                    .filter_map(|mut row| row.remove("object"))
                    .map(|term| Relation::new(subject.clone(), pattern.predicate, term.value))
                    .collect())
            }
            (None, Some(object)) => {
                let sparql = format!(
                    "SELECT ?subject WHERE {{ ?subject <{predicate}> <{object}> . \
                     FILTER(isIRI(?subject)) }}"
                );
                let response = self.execute(&sparql).await?;
                Ok(response
                    .bindings()
                    .into_iter()
                    .filter_map(|mut row| row.remove("subject"))
                    .map(|term| Relation::new(term.value, pattern.predicate, object.clone()))
                    .collect())
            }
            (None, None) => unreachable!("anchored pattern"),
        }
    }
}

#[async_trait]
impl NodeMetadataProvider for SparqlTripleStore {
    async fn class_of(&self, id: &NodeId) -> Result<Option<NodeClass>> {
        let sparql = format!("SELECT ?type WHERE {{ <{id}> <{RDF_TYPE}> ?type }}");
        let response = self.execute(&sparql).await?;
        Ok(response
            .bindings()
            .into_iter()
            .filter_map(|mut row| row.remove("type"))
            .find_map(|term| self.vocabulary.class_from_iri(&term.value)))
    }

    async fn label_of(&self, id: &NodeId) -> Result<Option<String>> {
        let sparql = format!("SELECT ?label WHERE {{ <{id}> <{RDFS_LABEL}> ?label }} LIMIT 1");
        let response = self.execute(&sparql).await?;
        Ok(response
            .bindings()
            .into_iter()
            .filter_map(|mut row| row.remove("label"))
            .map(|term| term.value)
            .next())
    }

    async fn find_by_label(&self, label: &str) -> Result<Option<Node>> {
        let literal = Self::escape_literal(label);
        let sparql = format!(
            "SELECT ?entity ?type WHERE {{ ?entity <{RDFS_LABEL}> \"{literal}\" . \
             ?entity <{RDF_TYPE}> ?type }} LIMIT 1"
        );
        let response = self.execute(&sparql).await?;

        let Some(mut row) = response.bindings().into_iter().next() else {
            return Ok(None);
        };
        let Some(entity) = row.remove("entity") else {
            return Ok(None);
        };
        let class = row
            .remove("type")
            .and_then(|term| self.vocabulary.class_from_iri(&term.value));

        Ok(class.map(|class| Node::new(entity.value, class, label)))
    }
}
