//! # Change Module
//!
//! The units of graph mutation.
//!
//! - [`CreateOperation`] / [`DeleteOperation`]: one (subject, predicate, value)
//!   triple to add or remove
//! - [`ChangeSet`]: the atomic unit; deletes are applied before creates
//! - [`Transformation`]: an ordered batch of change sets
//!
//! All types are immutable values once built. Things handed to the
//! constructors are copied, never borrowed past the call.

use crate::{ChronicleError, Iri, Thing, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// OPERATIONS
// =============================================================================

/// A single (subject, predicate, value) statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    subject: Iri,
    predicate: Iri,
    object: Value,
}

impl Triple {
    /// Create a triple.
    #[must_use]
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Value>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }

    /// The subject identifier.
    #[must_use]
    pub fn subject(&self) -> &Iri {
        &self.subject
    }

    /// The predicate identifier.
    #[must_use]
    pub fn predicate(&self) -> &Iri {
        &self.predicate
    }

    /// The object value.
    #[must_use]
    pub fn object(&self) -> &Value {
        &self.object
    }
}

/// Add one statement to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreateOperation(Triple);

impl CreateOperation {
    /// Create an add operation.
    #[must_use]
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Value>) -> Self {
        Self(Triple::new(subject, predicate, object))
    }

    /// The statement to add.
    #[must_use]
    pub fn triple(&self) -> &Triple {
        &self.0
    }
}

impl From<Triple> for CreateOperation {
    fn from(triple: Triple) -> Self {
        Self(triple)
    }
}

/// Remove one statement from the graph.
///
/// Removing a statement that is not present is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeleteOperation(Triple);

impl DeleteOperation {
    /// Create a remove operation.
    #[must_use]
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Value>) -> Self {
        Self(Triple::new(subject, predicate, object))
    }

    /// The statement to remove.
    #[must_use]
    pub fn triple(&self) -> &Triple {
        &self.0
    }
}

/// Either kind of operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    /// Add a statement.
    Create(CreateOperation),
    /// Remove a statement.
    Delete(DeleteOperation),
}

impl ChangeOperation {
    /// The statement the operation acts on.
    #[must_use]
    pub fn triple(&self) -> &Triple {
        match self {
            Self::Create(op) => op.triple(),
            Self::Delete(op) => op.triple(),
        }
    }
}

// =============================================================================
// CHANGE SET
// =============================================================================

/// An atomic unit of change: deletes first, then creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    deletes: Vec<DeleteOperation>,
    creates: Vec<CreateOperation>,
}

impl ChangeSet {
    /// Create a change set from precomputed operations.
    #[must_use]
    pub fn new(deletes: Vec<DeleteOperation>, creates: Vec<CreateOperation>) -> Self {
        Self { deletes, creates }
    }

    /// One create per (predicate, value) of the Thing, and no deletes.
    #[must_use]
    pub fn from_thing(thing: &Thing) -> Self {
        let creates = thing
            .triples()
            .map(|(p, v)| CreateOperation::new(thing.id().clone(), p.clone(), v.clone()))
            .collect();
        Self {
            deletes: Vec::new(),
            creates,
        }
    }

    /// The operations that turn `old` into `new`.
    ///
    /// Values only in `old` become deletes, values only in `new` become creates.
    pub fn diff(old: &Thing, new: &Thing) -> Result<Self, ChronicleError> {
        if old.id() != new.id() {
            return Err(ChronicleError::IdentifierMismatch(
                old.id().clone(),
                new.id().clone(),
            ));
        }
        let id = new.id();
        let deletes = old
            .triples()
            .filter(|(p, v)| !new.has_this_value(p, v))
            .map(|(p, v)| DeleteOperation::new(id.clone(), p.clone(), v.clone()))
            .collect();
        let creates = new
            .triples()
            .filter(|(p, v)| !old.has_this_value(p, v))
            .map(|(p, v)| CreateOperation::new(id.clone(), p.clone(), v.clone()))
            .collect();
        Ok(Self { deletes, creates })
    }

    /// Operations to remove, applied first.
    #[must_use]
    pub fn deletes(&self) -> &[DeleteOperation] {
        &self.deletes
    }

    /// Operations to add, applied after the deletes.
    #[must_use]
    pub fn creates(&self) -> &[CreateOperation] {
        &self.creates
    }

    /// Every operation in application order.
    pub fn operations(&self) -> impl Iterator<Item = ChangeOperation> + '_ {
        self.deletes
            .iter()
            .cloned()
            .map(ChangeOperation::Delete)
            .chain(self.creates.iter().cloned().map(ChangeOperation::Create))
    }

    /// Check if the set holds no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.creates.is_empty()
    }
}

// =============================================================================
// TRANSFORMATION
// =============================================================================

/// An ordered batch of change sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    change_sets: Vec<ChangeSet>,
}

impl Transformation {
    /// Create a transformation from change sets.
    #[must_use]
    pub fn new(change_sets: Vec<ChangeSet>) -> Self {
        Self { change_sets }
    }

    /// One change set per Thing, in input order.
    #[must_use]
    pub fn from_things<'a>(things: impl IntoIterator<Item = &'a Thing>) -> Self {
        Self {
            change_sets: things.into_iter().map(ChangeSet::from_thing).collect(),
        }
    }

    /// The change sets in application order.
    #[must_use]
    pub fn change_sets(&self) -> &[ChangeSet] {
        &self.change_sets
    }

    /// Total number of operations across all change sets.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.change_sets
            .iter()
            .map(|cs| cs.deletes.len() + cs.creates.len())
            .sum()
    }
}

// =============================================================================
// TESTS
// =============================================================================
