//! # Resolution Module
//!
//! Symbolic lookups: find the Things a sign denotes at a point in time, and
//! the signs that denote a Thing. Association lookups follow the same
//! pipeline, bounded by the interval of each participating state.
//!
//! Every lookup runs the same pipeline: one typed query, the temporal filter
//! at the point in time, then result assembly. A point in time without a
//! usable timestamp resolves to an empty list and no query is issued.
//!
//! ## Ambiguity
//!
//! The operations here return every match, zero, one or many, and never pick
//! one. Exactly-one lookups live on [`crate::Session::find_by_entity_name`].

use crate::query::{PATTERN_NAME, Query, QueryResultList, REP_BY_PATTERN_NAME, SIGN_VALUE};
use crate::storage::GraphStore;
use crate::temporal::{TemporalFilter, Timestamp};
use crate::vocab::{MEMBER_OF_KIND, term};
use crate::{ChronicleError, Iri, Thing, Value};
use serde::{Deserialize, Serialize};

/// A sign that represents an entity, with the names of its pattern and
/// representation-by-pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignPattern {
    /// The sign text.
    pub sign_value: String,
    /// Name of the pattern the sign is a member of.
    pub pattern_name: String,
    /// Name of the representation-by-pattern, if the representation has one.
    pub rep_by_pattern_name: Option<String>,
}

/// A state participating in an association, with the roles it plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDetails {
    /// The participating state.
    pub participant: Thing,
    /// The `member_of_kind` targets of the participant that are stored.
    pub roles: Vec<Thing>,
}

/// Sign-based entity resolution over any provider.
pub struct SignResolver;

impl SignResolver {
    /// Things represented by a sign with exactly `value`, under `pattern` and
    /// recognized by `community`, valid at `point_in_time`.
    ///
    /// A missing or empty `value` returns an empty list.
    pub fn find_by_sign_value<S: GraphStore + ?Sized>(
        store: &S,
        community: &Iri,
        pattern: &Iri,
        value: Option<&str>,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return Ok(Vec::new());
        };
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query = Query::sign_value(community.clone(), pattern.clone(), value);
        Self::things_at(store, &query, when)
    }

    /// Like [`SignResolver::find_by_sign_value`], matching any sign that
    /// contains `text`, ignoring case.
    pub fn find_by_partial_sign_value<S: GraphStore + ?Sized>(
        store: &S,
        community: &Iri,
        pattern: &Iri,
        text: Option<&str>,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Ok(Vec::new());
        };
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query = Query::partial_sign_value(community.clone(), pattern.clone(), text);
        Self::things_at(store, &query, when)
    }

    /// Members of `class` represented by a sign containing `text` at
    /// `point_in_time`.
    pub fn find_by_partial_sign_and_class<S: GraphStore + ?Sized>(
        store: &S,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
        case_sensitive: bool,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query = Query::members_of_class_by_partial_sign(class.clone(), text, case_sensitive);
        Self::things_at(store, &query, when)
    }

    /// Things of `rdf_type` that are members of `class` and are represented,
    /// at `point_in_time`, by a sign of `pattern`.
    pub fn find_by_type_class_and_sign_pattern<S: GraphStore + ?Sized>(
        store: &S,
        rdf_type: &Iri,
        class: &Iri,
        pattern: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query =
            Query::by_type_class_and_sign_pattern(rdf_type.clone(), class.clone(), pattern.clone());
        Self::things_at(store, &query, when)
    }

    /// Like [`SignResolver::find_by_type_class_and_sign_pattern`], with
    /// membership of `kind` instead of a class.
    pub fn find_by_type_kind_and_sign_pattern<S: GraphStore + ?Sized>(
        store: &S,
        rdf_type: &Iri,
        kind: &Iri,
        pattern: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query =
            Query::by_type_kind_and_sign_pattern(rdf_type.clone(), kind.clone(), pattern.clone());
        Self::things_at(store, &query, when)
    }

    /// Members of `class` referenced by `activity` and represented by a sign
    /// containing `text` at `point_in_time`.
    pub fn find_by_partial_sign_by_activity_reference_and_class<S: GraphStore + ?Sized>(
        store: &S,
        activity: &Iri,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
        case_sensitive: bool,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query = Query::members_of_class_by_activity_and_partial_sign(
            activity.clone(),
            class.clone(),
            text,
            case_sensitive,
        );
        Self::things_at(store, &query, when)
    }

    /// Members of `class` that are parts of `whole` and represented by a sign
    /// containing `text` at `point_in_time`.
    pub fn find_by_partial_sign_composition_and_class<S: GraphStore + ?Sized>(
        store: &S,
        whole: &Iri,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
        case_sensitive: bool,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query = Query::members_of_class_by_composition_and_partial_sign(
            whole.clone(),
            class.clone(),
            text,
            case_sensitive,
        );
        Self::things_at(store, &query, when)
    }

    /// Individuals with a state participating, at `point_in_time`, in an
    /// association of `kind`.
    pub fn find_by_kind_of_association<S: GraphStore + ?Sized>(
        store: &S,
        kind: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        Self::things_at(store, &Query::by_kind_of_association(kind.clone()), when)
    }

    /// Individuals ever associated with `item` through an association of
    /// `kind`. No temporal filter applies.
    pub fn find_associated<S: GraphStore + ?Sized>(
        store: &S,
        item: &Iri,
        kind: &Iri,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let rows = Self::run(store, &Query::associated(item.clone(), kind.clone()))?;
        store.to_top_objects(&rows)
    }

    /// Individuals associated with `item` through an association of `kind`,
    /// where the other individual's state is valid at `point_in_time`.
    pub fn find_associated_at<S: GraphStore + ?Sized>(
        store: &S,
        item: &Iri,
        kind: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        Self::things_at(store, &Query::associated(item.clone(), kind.clone()), when)
    }

    /// The states of `first` and `second` participating, at `point_in_time`,
    /// in associations of `kind` that involve both, each with its roles.
    ///
    /// Roles that are not stored are left out.
    pub fn find_participant_details<S: GraphStore + ?Sized>(
        store: &S,
        first: &Iri,
        second: &Iri,
        kind: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<ParticipantDetails>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let query = Query::participant_details(first.clone(), second.clone(), kind.clone());
        let member_of_kind = term(MEMBER_OF_KIND);

        let mut details = Vec::new();
        for participant in Self::things_at(store, &query, when)? {
            let mut roles = Vec::new();
            for role in participant.iri_values(&member_of_kind) {
                roles.extend(store.get(role)?);
            }
            details.push(ParticipantDetails { participant, roles });
        }
        Ok(details)
    }

    /// The signs representing `entity` at `point_in_time`, without repeats.
    pub fn find_signs_for_entity<S: GraphStore + ?Sized>(
        store: &S,
        entity: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<SignPattern>, ChronicleError> {
        let Some(when) = Timestamp::from_point_in_time(point_in_time) else {
            return Ok(Vec::new());
        };
        let rows = Self::run(store, &Query::signs_for_entity(entity.clone()))?;
        let rows = TemporalFilter::filter_by_instant(when, rows)?;

        let mut signs: Vec<SignPattern> = Vec::new();
        for row in rows.results() {
            let text = |name: &str| {
                row.get(name).map(Value::lexical).ok_or_else(|| {
                    ChronicleError::InvalidQueryResult(format!("?{name} is unbound"))
                })
            };
            let sign = SignPattern {
                sign_value: text(SIGN_VALUE)?,
                pattern_name: text(PATTERN_NAME)?,
                rep_by_pattern_name: row.get(REP_BY_PATTERN_NAME).map(Value::lexical),
            };
            if !signs.contains(&sign) {
                signs.push(sign);
            }
        }
        Ok(signs)
    }

    fn things_at<S: GraphStore + ?Sized>(
        store: &S,
        query: &Query,
        when: Timestamp,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let rows = Self::run(store, query)?;
        let rows = TemporalFilter::filter_by_instant(when, rows)?;
        let things = store.to_top_objects(&rows)?;
        tracing::debug!(
            query = query.query_type.name(),
            at = %when,
            matches = things.len(),
            "things resolved"
        );
        Ok(things)
    }

    fn run<S: GraphStore + ?Sized>(
        store: &S,
        query: &Query,
    ) -> Result<QueryResultList, ChronicleError> {
        store.execute_query(query).map_err(|e| match e {
            ChronicleError::InvalidQuery(message) => ChronicleError::Resolution(message),
            other => other,
        })
    }
}
