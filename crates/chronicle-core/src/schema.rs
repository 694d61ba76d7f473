//! # Schema Module
//!
//! The catalogue of entity kinds and the attributes each kind must or may
//! carry.
//!
//! A [`ThingBuilder`] checks a Thing against its kind before any change
//! operation exists; [`verify`] runs the same check over stored Things.
//!
//! Kinds are matched through `rdf:type`.

use crate::vocab::{
    BEGINNING, ENDING, ENTITY_NAME, EVENT, MEMBER_OF, MEMBER_OF_, MEMBER_OF_KIND,
    PART_OF_POSSIBLE_WORLD, PARTICIPANT_IN, PATTERN, PERSON, POINT_IN_TIME, POSSIBLE_WORLD,
    RDF_TYPE, RECOGNIZING_LANGUAGE_COMMUNITY, REPRESENTATION_BY_PATTERN, REPRESENTATION_BY_SIGN,
    REPRESENTS, SIGN, STATE_OF_PERSON, TEMPORAL_PART_OF, VALUE, term,
};
use crate::{ChronicleError, Iri, Thing, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// CARDINALITY
// =============================================================================

/// How many values a predicate may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// Mandatory and single-valued.
    ExactlyOne,
    /// Mandatory, any number of values.
    AtLeastOne,
    /// Optional and single-valued.
    ZeroOrOne,
    /// Optional, any number of values.
    Any,
}

impl Cardinality {
    /// Whether at least one value is required.
    #[must_use]
    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::ExactlyOne | Self::AtLeastOne)
    }

    /// Whether more than one value is allowed.
    #[must_use]
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Self::AtLeastOne | Self::Any)
    }

    /// Check a value count for `predicate`.
    pub fn check(self, predicate: &Iri, count: usize) -> Result<(), ChronicleError> {
        if count == 0 && self.is_mandatory() {
            return Err(ChronicleError::PropertyNotSet(
                predicate.local_name().to_string(),
            ));
        }
        if count > 1 && !self.is_multi_valued() {
            return Err(ChronicleError::Cardinality {
                predicate: predicate.local_name().to_string(),
                count,
            });
        }
        Ok(())
    }
}

// =============================================================================
// KIND SCHEMAS
// =============================================================================

/// One attribute rule of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateRule {
    pub predicate: Iri,
    pub cardinality: Cardinality,
}

/// The attribute rules of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSchema {
    kind: Iri,
    rules: Vec<PredicateRule>,
}

impl KindSchema {
    /// A kind with no rules.
    #[must_use]
    pub fn new(kind: Iri) -> Self {
        Self {
            kind,
            rules: Vec::new(),
        }
    }

    /// Add a rule.
    #[must_use]
    pub fn with_rule(mut self, predicate: Iri, cardinality: Cardinality) -> Self {
        self.rules.push(PredicateRule {
            predicate,
            cardinality,
        });
        self
    }

    #[must_use]
    pub fn kind(&self) -> &Iri {
        &self.kind
    }

    #[must_use]
    pub fn rules(&self) -> &[PredicateRule] {
        &self.rules
    }

    /// Check every rule against `thing`, stopping at the first violation.
    pub fn check(&self, thing: &Thing) -> Result<(), ChronicleError> {
        for rule in &self.rules {
            let count = thing.values(&rule.predicate).map_or(0, |v| v.len());
            rule.cardinality.check(&rule.predicate, count)?;
        }
        Ok(())
    }
}

// =============================================================================
// CATALOGUE
// =============================================================================

/// Lookup of kind schemas.
pub trait SchemaCatalogue {
    /// The schema for `kind`, if catalogued.
    fn schema(&self, kind: &Iri) -> Option<&KindSchema>;
}

/// A catalogue held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogue {
    schemas: BTreeMap<Iri, KindSchema>,
}

impl StaticCatalogue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a kind.
    #[must_use]
    pub fn with_schema(mut self, schema: KindSchema) -> Self {
        self.schemas.insert(schema.kind.clone(), schema);
        self
    }

    /// Number of catalogued kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// The HQDM kinds used by sign resolution and state modelling.
    #[must_use]
    pub fn hqdm() -> Self {
        use Cardinality::{Any, AtLeastOne, ExactlyOne, ZeroOrOne};

        let kind = |k| KindSchema::new(term(k));
        Self::new()
            .with_schema(
                kind(SIGN)
                    .with_rule(term(VALUE), ExactlyOne)
                    .with_rule(term(MEMBER_OF_), ExactlyOne)
                    .with_rule(term(PARTICIPANT_IN), AtLeastOne),
            )
            .with_schema(kind(PATTERN).with_rule(term(ENTITY_NAME), ZeroOrOne))
            .with_schema(
                kind(REPRESENTATION_BY_SIGN)
                    .with_rule(term(REPRESENTS), AtLeastOne)
                    .with_rule(term(MEMBER_OF_), ZeroOrOne)
                    .with_rule(term(BEGINNING), ZeroOrOne)
                    .with_rule(term(ENDING), ZeroOrOne),
            )
            .with_schema(kind(REPRESENTATION_BY_PATTERN).with_rule(term(ENTITY_NAME), ZeroOrOne))
            .with_schema(
                kind(RECOGNIZING_LANGUAGE_COMMUNITY)
                    .with_rule(term(PARTICIPANT_IN), Any)
                    .with_rule(term(ENTITY_NAME), ZeroOrOne),
            )
            .with_schema(
                kind(POINT_IN_TIME)
                    .with_rule(term(ENTITY_NAME), ExactlyOne)
                    .with_rule(term(PART_OF_POSSIBLE_WORLD), ExactlyOne),
            )
            .with_schema(
                kind(EVENT)
                    .with_rule(term(ENTITY_NAME), ZeroOrOne)
                    .with_rule(term(PART_OF_POSSIBLE_WORLD), ExactlyOne),
            )
            .with_schema(
                kind(PERSON)
                    .with_rule(term(PART_OF_POSSIBLE_WORLD), ExactlyOne)
                    .with_rule(term(MEMBER_OF), Any)
                    .with_rule(term(MEMBER_OF_KIND), Any),
            )
            .with_schema(
                kind(STATE_OF_PERSON)
                    .with_rule(term(TEMPORAL_PART_OF), ExactlyOne)
                    .with_rule(term(PART_OF_POSSIBLE_WORLD), ExactlyOne),
            )
            .with_schema(kind(POSSIBLE_WORLD).with_rule(term(ENTITY_NAME), ZeroOrOne))
    }
}

impl SchemaCatalogue for StaticCatalogue {
    fn schema(&self, kind: &Iri) -> Option<&KindSchema> {
        self.schemas.get(kind)
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builds a Thing of one kind and checks it before handing it out.
///
/// ```
/// use chronicle_core::schema::{StaticCatalogue, ThingBuilder};
/// use chronicle_core::vocab::{ENTITY_NAME, PART_OF_POSSIBLE_WORLD, POINT_IN_TIME, term};
/// use chronicle_core::Iri;
///
/// let catalogue = StaticCatalogue::hqdm();
/// let id = Iri::parse("http://example.com/now").unwrap();
/// let world = Iri::parse("http://example.com/world").unwrap();
///
/// let err = ThingBuilder::new(&catalogue, term(POINT_IN_TIME), id.clone())
///     .value(term(ENTITY_NAME), "2020-01-01T00:00:00Z")
///     .build()
///     .unwrap_err();
/// assert_eq!(err.to_string(), "Property Not Set: part_of_possible_world");
///
/// let pit = ThingBuilder::new(&catalogue, term(POINT_IN_TIME), id)
///     .value(term(ENTITY_NAME), "2020-01-01T00:00:00Z")
///     .value(term(PART_OF_POSSIBLE_WORLD), world)
///     .build()
///     .unwrap();
/// assert!(pit.has_value(&term(ENTITY_NAME)));
/// ```
pub struct ThingBuilder<'c> {
    catalogue: &'c dyn SchemaCatalogue,
    kind: Iri,
    thing: Thing,
}

impl<'c> ThingBuilder<'c> {
    /// Start a Thing of `kind`. The `rdf:type` statement is added here.
    #[must_use]
    pub fn new(catalogue: &'c dyn SchemaCatalogue, kind: Iri, id: Iri) -> Self {
        let thing = Thing::new(id).with_value(term(RDF_TYPE), kind.clone());
        Self {
            catalogue,
            kind,
            thing,
        }
    }

    /// Add a value.
    #[must_use]
    pub fn value(mut self, predicate: Iri, value: impl Into<Value>) -> Self {
        self.thing.add_value(predicate, value);
        self
    }

    /// Check the Thing against its kind.
    pub fn build(self) -> Result<Thing, ChronicleError> {
        let schema = self.catalogue.schema(&self.kind).ok_or_else(|| {
            ChronicleError::Unsupported(format!("no schema for kind {}", self.kind))
        })?;
        schema.check(&self.thing)?;
        Ok(self.thing)
    }
}

// =============================================================================
// MODEL VERIFICATION
// =============================================================================

/// A stored Thing that breaks its kind's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub subject: Iri,
    pub kind: Iri,
    pub message: String,
}

/// Check every Thing whose `rdf:type` names a catalogued kind.
///
/// A Thing of several catalogued kinds is reported once per broken kind.
#[must_use]
pub fn verify(catalogue: &dyn SchemaCatalogue, things: &[Thing]) -> Vec<SchemaViolation> {
    let rdf_type = term(RDF_TYPE);
    let mut violations = Vec::new();
    for thing in things {
        for kind in thing.iri_values(&rdf_type) {
            let Some(schema) = catalogue.schema(kind) else {
                continue;
            };
            if let Err(e) = schema.check(thing) {
                violations.push(SchemaViolation {
                    subject: thing.id().clone(),
                    kind: kind.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    violations
}
