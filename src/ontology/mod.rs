//! Ontology module: the graph data model, the relation schema, and class
//! validation.
//!
//! The class set and relation kinds form a closed vocabulary; what may
//! connect to what is described by a static rule table rather than
//! runtime type inspection.

mod schema;
mod types;
mod validator;

pub use schema::{OntologySchema, RelationRule};
pub use types::{
    Candidate, Direction, Node, NodeClass, NodeId, OwnershipPath, Relation, RelationKind,
};
pub use validator::OntologyValidator;
