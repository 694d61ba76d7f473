//! # Core Type Definitions
//!
//! This module contains the entity model shared by every other module:
//! - Identifiers (`Iri`) and attribute values (`Value`)
//! - The multi-valued entity (`Thing`)
//! - Transaction modes (`TransactionMode`)
//! - Error types (`ChronicleError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` so attribute sets live in `BTreeMap`/`BTreeSet`
//! - Use integer literals only (no floating-point values)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Characters that may never appear inside an identifier.
const FORBIDDEN_IRI_CHARS: &[char] = &['<', '>', '"', '{', '}', '|', '^', '`', '\\'];

/// An absolute, validated identifier (`scheme:rest`).
///
/// Every `Iri` reachable from safe code has passed [`Iri::parse`], so it can be
/// embedded into query text or a dump without further escaping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iri(String);

impl Iri {
    /// Parse and validate an identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, ChronicleError> {
        let s = s.into();
        validate_iri(&s)?;
        Ok(Self(s))
    }

    /// Wrap a compile-time vocabulary constant without validation.
    ///
    /// Only for the constants in [`crate::vocab`]; runtime input goes through
    /// [`Iri::parse`].
    #[must_use]
    pub fn from_static(s: &'static str) -> Self {
        Self(s.to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fragment or last path segment, e.g. `member_of` for `...hqdm#member_of`.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.0
            .rsplit(['#', '/'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.0.as_str())
    }
}

fn validate_iri(s: &str) -> Result<(), ChronicleError> {
    let Some(colon) = s.find(':') else {
        return Err(ChronicleError::InvalidIri(format!("missing scheme: {s:?}")));
    };

    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(ChronicleError::InvalidIri(format!("invalid scheme: {s:?}")));
    }
    if colon + 1 == s.len() {
        return Err(ChronicleError::InvalidIri(format!("empty after scheme: {s:?}")));
    }
    if let Some(bad) = s
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_IRI_CHARS.contains(c))
    {
        return Err(ChronicleError::InvalidIri(format!(
            "illegal character {bad:?} in {s:?}"
        )));
    }
    Ok(())
}

impl TryFrom<String> for Iri {
    type Error = ChronicleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Iri> for String {
    fn from(iri: Iri) -> Self {
        iri.0
    }
}

impl FromStr for Iri {
    type Err = ChronicleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// VALUES
// =============================================================================

/// The object position of a triple: another entity, or a primitive literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Reference to another entity.
    Iri(Iri),
    /// Plain string literal.
    Text(String),
    /// Integer literal.
    Integer(i64),
    /// Boolean literal.
    Boolean(bool),
}

impl Value {
    /// Create a text literal.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// The referenced entity, if this value is an identifier.
    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// The string literal, if this value is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The lexical form of the value, without type information.
    #[must_use]
    pub fn lexical(&self) -> String {
        match self {
            Self::Iri(iri) => iri.as_str().to_string(),
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Boolean(b) => b.to_string(),
        }
    }
}

impl From<Iri> for Value {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<&Iri> for Value {
    fn from(iri: &Iri) -> Self {
        Self::Iri(iri.clone())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

// =============================================================================
// THING
// =============================================================================

/// An entity: a stable identifier plus a multi-valued attribute map.
///
/// A predicate key is present only while it holds at least one value; removing
/// the last value removes the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawThing")]
pub struct Thing {
    id: Iri,
    predicates: BTreeMap<Iri, BTreeSet<Value>>,
}

/// Wire shape of a `Thing`; empty value sets are dropped on the way in.
#[derive(Deserialize)]
struct RawThing {
    id: Iri,
    predicates: BTreeMap<Iri, BTreeSet<Value>>,
}

impl From<RawThing> for Thing {
    fn from(mut raw: RawThing) -> Self {
        raw.predicates.retain(|_, values| !values.is_empty());
        Self {
            id: raw.id,
            predicates: raw.predicates,
        }
    }
}

impl Thing {
    /// Create an entity with no attributes.
    #[must_use]
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            predicates: BTreeMap::new(),
        }
    }

    /// The entity identifier.
    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    /// Add a value. Returns `false` if it was already present.
    pub fn add_value(&mut self, predicate: Iri, value: impl Into<Value>) -> bool {
        self.predicates
            .entry(predicate)
            .or_default()
            .insert(value.into())
    }

    /// Builder-style variant of [`Thing::add_value`].
    #[must_use]
    pub fn with_value(mut self, predicate: Iri, value: impl Into<Value>) -> Self {
        self.add_value(predicate, value);
        self
    }

    /// Remove a value. Returns `false` if it was not present.
    pub fn remove_value(&mut self, predicate: &Iri, value: &Value) -> bool {
        let Some(values) = self.predicates.get_mut(predicate) else {
            return false;
        };
        let removed = values.remove(value);
        if values.is_empty() {
            self.predicates.remove(predicate);
        }
        removed
    }

    /// All values for a predicate.
    #[must_use]
    pub fn values(&self, predicate: &Iri) -> Option<&BTreeSet<Value>> {
        self.predicates.get(predicate)
    }

    /// The first value for a predicate (in value order).
    #[must_use]
    pub fn one_value(&self, predicate: &Iri) -> Option<&Value> {
        self.predicates.get(predicate).and_then(|v| v.iter().next())
    }

    /// Identifier values for a predicate, skipping literals.
    pub fn iri_values<'a>(&'a self, predicate: &Iri) -> impl Iterator<Item = &'a Iri> + 'a {
        self.predicates
            .get(predicate)
            .into_iter()
            .flatten()
            .filter_map(Value::as_iri)
    }

    /// Check if the predicate has any value.
    #[must_use]
    pub fn has_value(&self, predicate: &Iri) -> bool {
        self.predicates.contains_key(predicate)
    }

    /// Check if the predicate holds exactly this value.
    #[must_use]
    pub fn has_this_value(&self, predicate: &Iri, value: &Value) -> bool {
        self.predicates
            .get(predicate)
            .is_some_and(|values| values.contains(value))
    }

    /// The full attribute map.
    #[must_use]
    pub fn predicates(&self) -> &BTreeMap<Iri, BTreeSet<Value>> {
        &self.predicates
    }

    /// Every (predicate, value) pair in deterministic order.
    pub fn triples(&self) -> impl Iterator<Item = (&Iri, &Value)> + '_ {
        self.predicates
            .iter()
            .flat_map(|(p, values)| values.iter().map(move |v| (p, v)))
    }

    /// Number of (predicate, value) pairs.
    #[must_use]
    pub fn triple_count(&self) -> usize {
        self.predicates.values().map(BTreeSet::len).sum()
    }

    /// Check if the entity holds no attributes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

// =============================================================================
// TRANSACTION MODE
// =============================================================================

/// The transaction state of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionMode {
    /// No transaction open.
    #[default]
    Idle,
    /// A read transaction is open.
    Read,
    /// A write transaction is open.
    Write,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Read => f.write_str("in a read transaction"),
            Self::Write => f.write_str("in a write transaction"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur anywhere in Chronicle.
///
/// - Validation errors are raised before any change operation exists
/// - Transaction-state errors are programming errors and never retried
/// - Provider failures pass through unchanged
#[derive(Debug, Error)]
pub enum ChronicleError {
    /// A mandatory attribute is missing at build time.
    #[error("Property Not Set: {0}")]
    PropertyNotSet(String),

    /// An attribute holds more values than its cardinality allows.
    #[error("Cardinality violated for {predicate}: {count} values")]
    Cardinality { predicate: String, count: usize },

    /// An identifier failed validation.
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// A timestamp could not be parsed.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Two identifiers that must match do not.
    #[error("Identifier mismatch: {0} != {1}")]
    IdentifierMismatch(Iri, Iri),

    /// An exactly-one lookup found nothing.
    #[error("No entity found with name: {0}")]
    NotFound(String),

    /// An exactly-one lookup found several candidates.
    #[error("Multiple entities ({count}) found with name: {name}")]
    Ambiguous { name: String, count: usize },

    /// Transaction control called in the wrong state.
    #[error("Cannot {operation} while {mode}")]
    TransactionState {
        operation: &'static str,
        mode: TransactionMode,
    },

    /// A write was attempted inside a read transaction.
    #[error("Write attempted inside a read transaction")]
    ReadOnly,

    /// The underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// The provider rejected a query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Query rows did not have the expected shape.
    #[error("Invalid query result: {0}")]
    InvalidQueryResult(String),

    /// A symbolic lookup could not be resolved.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The provider does not offer this capability.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<std::io::Error> for ChronicleError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
