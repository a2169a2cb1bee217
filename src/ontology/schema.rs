//! Table-driven ontology schema.
//!
//! The schema records which node classes may appear on each side of each
//! relation kind. It is pure data with lookup methods; integrity
//! enforcement happens where relations are read from the store.

use crate::ontology::{NodeClass, RelationKind};

/// Allowed subject/object classes for one relation kind.
#[derive(Debug, Clone)]
pub struct RelationRule {
    /// The relation kind this rule constrains.
    pub predicate: RelationKind,
    /// Classes permitted as the subject of the relation.
    pub subject_classes: Vec<NodeClass>,
    /// Classes permitted as the object of the relation.
    pub object_classes: Vec<NodeClass>,
}

/// Static description of node classes and the relation kinds allowed
/// between them.
#[derive(Debug, Clone)]
pub struct OntologySchema {
    rules: Vec<RelationRule>,
}

impl OntologySchema {
    /// The standard service-ownership schema.
    ///
    /// - `owns_directly`: Team -> any ownable class. Teams are always the
    ///   owning side and are never owned themselves.
    /// - `part_of`: containee -> container, both ownable classes.
    /// - `uses`: dependency between ownable classes, excluded from
    ///   ownership reasoning.
    pub fn standard() -> Self {
        let ownable = NodeClass::ownable().to_vec();
        Self {
            rules: vec![
                RelationRule {
                    predicate: RelationKind::OwnsDirectly,
                    subject_classes: vec![NodeClass::Team],
                    object_classes: ownable.clone(),
                },
                RelationRule {
                    predicate: RelationKind::PartOf,
                    subject_classes: ownable.clone(),
                    object_classes: ownable.clone(),
                },
                RelationRule {
                    predicate: RelationKind::Uses,
                    subject_classes: ownable.clone(),
                    object_classes: ownable,
                },
            ],
        }
    }

    /// All node classes the schema recognizes.
    pub fn allowed_classes(&self) -> &'static [NodeClass] {
        NodeClass::all()
    }

    /// The rule for a relation kind.
    pub fn rule_for(&self, predicate: RelationKind) -> Option<&RelationRule> {
        self.rules.iter().find(|r| r.predicate == predicate)
    }

    /// Check whether a relation between the given classes is permitted.
    pub fn is_valid_relation(
        &self,
        predicate: RelationKind,
        subject_class: NodeClass,
        object_class: NodeClass,
    ) -> bool {
        self.rule_for(predicate)
            .map(|rule| {
                rule.subject_classes.contains(&subject_class)
                    && rule.object_classes.contains(&object_class)
            })
            .unwrap_or(false)
    }
}

impl Default for OntologySchema {
    fn default() -> Self {
        Self::standard()
    }
}
