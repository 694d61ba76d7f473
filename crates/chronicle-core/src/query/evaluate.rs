//! Template evaluation for the reference providers.
//!
//! Joins are nested scans over a [`TripleSource`]; no indexes are built.

use super::{
    FINISH, OBJECT, PATTERN_NAME, PREDICATE, Query, QueryResult, QueryResultList, QueryType,
    REP_BY_PATTERN_NAME, SIGN_VALUE, START, SUBJECT,
};
use crate::vocab::{
    BEGINNING, ENDING, ENTITY_NAME, MEMBER_OF, MEMBER_OF_, MEMBER_OF_KIND, PART__OF,
    PARTICIPANT_IN, RDF_TYPE, REFERENCES, REPRESENTS, TEMPORAL_PART_OF, VALUE, term,
};
use crate::{ChronicleError, Iri, Thing, Value};
use std::collections::BTreeSet;

/// Read access to stored entities, as seen by the current transaction.
pub trait TripleSource {
    /// Look up one entity.
    fn thing(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError>;

    /// Visit every stored entity in identifier order.
    fn for_each_thing(
        &self,
        visit: &mut dyn FnMut(&Thing) -> Result<(), ChronicleError>,
    ) -> Result<(), ChronicleError>;
}

/// How a sign's text must relate to the search text.
enum TextMatch<'a> {
    Any,
    Exact(&'a str),
    Contains(&'a str),
    ContainsIgnoreCase(String),
}

impl<'a> TextMatch<'a> {
    fn partial(text: &'a str, case_sensitive: bool) -> Self {
        if case_sensitive {
            Self::Contains(text)
        } else {
            Self::ContainsIgnoreCase(text.to_lowercase())
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(s) => candidate == *s,
            Self::Contains(s) => candidate.contains(s),
            Self::ContainsIgnoreCase(lower) => candidate.to_lowercase().contains(lower.as_str()),
        }
    }
}

/// Evaluate a query template against a source.
pub fn evaluate<S: TripleSource + ?Sized>(
    source: &S,
    query: &Query,
) -> Result<QueryResultList, ChronicleError> {
    let var_names = query.query_type.var_names();
    let rows = match &query.query_type {
        QueryType::FindBySignValue {
            community,
            pattern,
            value,
        } => sign_rows(
            source,
            &TextMatch::Exact(value),
            Some(community),
            Some(pattern),
            &|_| true,
        )?,
        QueryType::FindByPartialSignValue {
            community,
            pattern,
            text,
        } => sign_rows(
            source,
            &TextMatch::ContainsIgnoreCase(text.to_lowercase()),
            Some(community),
            Some(pattern),
            &|_| true,
        )?,
        QueryType::FindMembersOfClassByPartialSign {
            class,
            text,
            case_sensitive,
        } => {
            let matcher = TextMatch::partial(text, *case_sensitive);
            let class = Value::from(class);
            sign_rows(source, &matcher, None, None, &|subject| {
                subject.has_this_value(&term(MEMBER_OF), &class)
            })?
        }
        QueryType::FindByTypeClassAndSignPattern {
            rdf_type,
            class,
            pattern,
        } => typed_sign_pattern_rows(source, rdf_type, MEMBER_OF, class, pattern)?,
        QueryType::FindByTypeKindAndSignPattern {
            rdf_type,
            kind,
            pattern,
        } => typed_sign_pattern_rows(source, rdf_type, MEMBER_OF_KIND, kind, pattern)?,
        QueryType::FindMembersOfClassByActivityAndPartialSign {
            activity,
            class,
            text,
            case_sensitive,
        } => match source.thing(activity)? {
            Some(activity) => {
                let matcher = TextMatch::partial(text, *case_sensitive);
                let class = Value::from(class);
                let references = term(REFERENCES);
                sign_rows(source, &matcher, None, None, &|subject| {
                    activity.has_this_value(&references, &Value::from(subject.id()))
                        && subject.has_this_value(&term(MEMBER_OF), &class)
                })?
            }
            None => Vec::new(),
        },
        QueryType::FindMembersOfClassByCompositionAndPartialSign {
            whole,
            class,
            text,
            case_sensitive,
        } => {
            let matcher = TextMatch::partial(text, *case_sensitive);
            let whole = Value::from(whole);
            let class = Value::from(class);
            sign_rows(source, &matcher, None, None, &|subject| {
                subject.has_this_value(&term(PART__OF), &whole)
                    && subject.has_this_value(&term(MEMBER_OF), &class)
            })?
        }
        QueryType::FindByKindOfAssociation { kind } => kind_of_association_rows(source, kind)?,
        QueryType::FindAssociated { item, kind } => associated_rows(source, item, kind)?,
        QueryType::FindParticipantDetails {
            first,
            second,
            kind,
        } => participant_detail_rows(source, first, second, kind)?,
        QueryType::FindSignsForEntity { entity } => signs_for_entity_rows(source, entity)?,
        QueryType::FindByPredicate { predicate, object } => subject_rows(source, |thing| {
            match object {
                Some(o) => thing.has_this_value(predicate, o),
                None => thing.has_value(predicate),
            }
        })?,
        QueryType::FindByPredicateTextCaseInsensitive { predicate, text } => {
            let lower = text.to_lowercase();
            subject_rows(source, |thing| {
                thing
                    .values(predicate)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_text)
                    .any(|t| t.to_lowercase() == lower)
            })?
        }
        QueryType::FindByFieldValueAndClass {
            field,
            value,
            class,
        } => {
            let member_of = term(MEMBER_OF);
            let class = Value::from(class);
            subject_rows(source, |thing| {
                thing.has_this_value(field, value) && thing.has_this_value(&member_of, &class)
            })?
        }
    };

    tracing::debug!(query = query.query_type.name(), rows = rows.len(), "query evaluated");
    Ok(QueryResultList::new(var_names, rows))
}

// =============================================================================
// TRIPLE ROWS
// =============================================================================

fn triple_row(thing: &Thing, predicate: &Iri, object: &Value) -> QueryResult {
    QueryResult::new()
        .with(SUBJECT, thing.id())
        .with(PREDICATE, predicate)
        .with(OBJECT, object.clone())
}

fn subject_rows<S, F>(source: &S, keep: F) -> Result<Vec<QueryResult>, ChronicleError>
where
    S: TripleSource + ?Sized,
    F: Fn(&Thing) -> bool,
{
    let mut rows = Vec::new();
    source.for_each_thing(&mut |thing| {
        if keep(thing) {
            rows.extend(thing.triples().map(|(p, o)| triple_row(thing, p, o)));
        }
        Ok(())
    })?;
    Ok(rows)
}

// =============================================================================
// SIGN JOINS
// =============================================================================

/// `(start, finish)` text pairs for a representation; `None` is unbound.
type Bounds = Vec<(Option<String>, Option<String>)>;

fn event_names<S: TripleSource + ?Sized>(
    source: &S,
    holder: &Thing,
    predicate: &'static str,
) -> Result<Vec<Option<String>>, ChronicleError> {
    let entity_name = term(ENTITY_NAME);
    let mut names = Vec::new();
    for event in holder.iri_values(&term(predicate)) {
        if let Some(event) = source.thing(event)? {
            names.extend(
                event
                    .values(&entity_name)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_text)
                    .map(|s| Some(s.to_string())),
            );
        }
    }
    if names.is_empty() {
        names.push(None);
    }
    Ok(names)
}

fn interval_bounds<S: TripleSource + ?Sized>(source: &S, rep: &Thing) -> Result<Bounds, ChronicleError> {
    let starts = event_names(source, rep, BEGINNING)?;
    let finishes = event_names(source, rep, ENDING)?;
    Ok(starts
        .iter()
        .flat_map(|s| finishes.iter().map(move |f| (s.clone(), f.clone())))
        .collect())
}

fn bind_bounds(mut row: QueryResult, start: &Option<String>, finish: &Option<String>) -> QueryResult {
    if let Some(s) = start {
        row.bind(START, Value::text(s));
    }
    if let Some(f) = finish {
        row.bind(FINISH, Value::text(f));
    }
    row
}

/// Representations of signs whose text matches, optionally restricted to a
/// pattern, in first-seen order.
fn matching_representations<S: TripleSource + ?Sized>(
    source: &S,
    matcher: &TextMatch<'_>,
    pattern: Option<&Iri>,
) -> Result<Vec<Iri>, ChronicleError> {
    let value = term(VALUE);
    let member_of_ = term(MEMBER_OF_);
    let participant_in = term(PARTICIPANT_IN);
    let pattern = pattern.map(Value::from);

    let mut seen = BTreeSet::new();
    let mut reps = Vec::new();
    source.for_each_thing(&mut |thing| {
        let text_matches = thing
            .values(&value)
            .into_iter()
            .flatten()
            .filter_map(Value::as_text)
            .any(|t| matcher.matches(t));
        let pattern_matches = pattern
            .as_ref()
            .is_none_or(|p| thing.has_this_value(&member_of_, p));
        if text_matches && pattern_matches {
            for rep in thing.iri_values(&participant_in) {
                if seen.insert(rep.clone()) {
                    reps.push(rep.clone());
                }
            }
        }
        Ok(())
    })?;
    Ok(reps)
}

/// Subject triples, with representation bounds, for every representation of
/// a matching sign whose subject passes `keep`.
fn sign_rows<S: TripleSource + ?Sized>(
    source: &S,
    matcher: &TextMatch<'_>,
    community: Option<&Iri>,
    pattern: Option<&Iri>,
    keep: &dyn Fn(&Thing) -> bool,
) -> Result<Vec<QueryResult>, ChronicleError> {
    let participant_in = term(PARTICIPANT_IN);
    let represents = term(REPRESENTS);

    let community = match community {
        Some(id) => match source.thing(id)? {
            Some(thing) => Some(thing),
            None => return Ok(Vec::new()),
        },
        None => None,
    };

    let mut rows = Vec::new();
    for rep_id in matching_representations(source, matcher, pattern)? {
        if let Some(community) = &community
            && !community.has_this_value(&participant_in, &Value::from(&rep_id))
        {
            continue;
        }
        let Some(rep) = source.thing(&rep_id)? else {
            continue;
        };
        let bounds = interval_bounds(source, &rep)?;
        for subject_id in rep.iri_values(&represents) {
            let Some(subject) = source.thing(subject_id)? else {
                continue;
            };
            if !keep(&subject) {
                continue;
            }
            for (start, finish) in &bounds {
                for (p, o) in subject.triples() {
                    rows.push(bind_bounds(triple_row(&subject, p, o), start, finish));
                }
            }
        }
    }
    Ok(rows)
}

fn typed_sign_pattern_rows<S: TripleSource + ?Sized>(
    source: &S,
    rdf_type: &Iri,
    membership: &'static str,
    collection: &Iri,
    pattern: &Iri,
) -> Result<Vec<QueryResult>, ChronicleError> {
    let rdf_type = Value::from(rdf_type);
    let collection = Value::from(collection);
    sign_rows(source, &TextMatch::Any, None, Some(pattern), &|subject| {
        subject.has_this_value(&term(RDF_TYPE), &rdf_type)
            && subject.has_this_value(&term(membership), &collection)
    })
}

fn entity_name_of<S: TripleSource + ?Sized>(
    source: &S,
    id: &Iri,
) -> Result<Option<String>, ChronicleError> {
    Ok(source.thing(id)?.and_then(|thing| {
        thing
            .values(&term(ENTITY_NAME))
            .into_iter()
            .flatten()
            .find_map(Value::as_text)
            .map(str::to_string)
    }))
}

fn signs_for_entity_rows<S: TripleSource + ?Sized>(
    source: &S,
    entity: &Iri,
) -> Result<Vec<QueryResult>, ChronicleError> {
    let represents = term(REPRESENTS);
    let participant_in = term(PARTICIPANT_IN);
    let member_of_ = term(MEMBER_OF_);
    let value = term(VALUE);
    let entity = Value::from(entity);

    let mut reps = Vec::new();
    source.for_each_thing(&mut |thing| {
        if thing.has_this_value(&represents, &entity) {
            reps.push(thing.clone());
        }
        Ok(())
    })?;
    if reps.is_empty() {
        return Ok(Vec::new());
    }
    let rep_ids: BTreeSet<Value> = reps.iter().map(|r| Value::from(r.id())).collect();

    let mut signs = Vec::new();
    source.for_each_thing(&mut |thing| {
        if thing.has_value(&value)
            && thing
                .values(&participant_in)
                .into_iter()
                .flatten()
                .any(|v| rep_ids.contains(v))
        {
            signs.push(thing.clone());
        }
        Ok(())
    })?;

    let mut rows = Vec::new();
    for rep in &reps {
        let rep_value = Value::from(rep.id());
        let mut rep_by_pattern_name = None;
        for rbp in rep.iri_values(&member_of_) {
            if let Some(name) = entity_name_of(source, rbp)? {
                rep_by_pattern_name = Some(name);
                break;
            }
        }
        let bounds = interval_bounds(source, rep)?;

        for sign in signs
            .iter()
            .filter(|s| s.has_this_value(&participant_in, &rep_value))
        {
            for pattern in sign.iri_values(&member_of_) {
                let Some(pattern_name) = entity_name_of(source, pattern)? else {
                    continue;
                };
                for sign_value in sign.values(&value).into_iter().flatten() {
                    for (start, finish) in &bounds {
                        let mut row = QueryResult::new()
                            .with(SIGN_VALUE, sign_value.clone())
                            .with(PATTERN_NAME, pattern_name.as_str());
                        if let Some(name) = &rep_by_pattern_name {
                            row.bind(REP_BY_PATTERN_NAME, name.as_str());
                        }
                        rows.push(bind_bounds(row, start, finish));
                    }
                }
            }
        }
    }
    Ok(rows)
}

// =============================================================================
// ASSOCIATION JOINS
// =============================================================================

/// A state participating in an association, with the individual it is a
/// temporal part of.
struct Participation {
    association: Iri,
    participant: Thing,
    whole: Iri,
}

/// Every participation in an association that is a member of `kind`.
fn participations<S: TripleSource + ?Sized>(
    source: &S,
    kind: &Iri,
) -> Result<Vec<Participation>, ChronicleError> {
    let member_of_kind = term(MEMBER_OF_KIND);
    let participant_in = term(PARTICIPANT_IN);
    let temporal_part_of = term(TEMPORAL_PART_OF);
    let kind = Value::from(kind);

    let mut associations = BTreeSet::new();
    source.for_each_thing(&mut |thing| {
        if thing.has_this_value(&member_of_kind, &kind) {
            associations.insert(thing.id().clone());
        }
        Ok(())
    })?;
    if associations.is_empty() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    source.for_each_thing(&mut |thing| {
        for association in thing
            .iri_values(&participant_in)
            .filter(|a| associations.contains(*a))
        {
            for whole in thing.iri_values(&temporal_part_of) {
                found.push(Participation {
                    association: association.clone(),
                    participant: thing.clone(),
                    whole: whole.clone(),
                });
            }
        }
        Ok(())
    })?;
    Ok(found)
}

/// Triples of `subject`, bounded by the interval of `participant`.
fn participant_rows<S: TripleSource + ?Sized>(
    source: &S,
    subject: &Thing,
    participant: &Thing,
    rows: &mut Vec<QueryResult>,
) -> Result<(), ChronicleError> {
    for (start, finish) in &interval_bounds(source, participant)? {
        for (p, o) in subject.triples() {
            rows.push(bind_bounds(triple_row(subject, p, o), start, finish));
        }
    }
    Ok(())
}

fn whole_rows<'a, S, I>(source: &S, participations: I) -> Result<Vec<QueryResult>, ChronicleError>
where
    S: TripleSource + ?Sized,
    I: IntoIterator<Item = &'a Participation>,
{
    let mut rows = Vec::new();
    for participation in participations {
        if let Some(whole) = source.thing(&participation.whole)? {
            participant_rows(source, &whole, &participation.participant, &mut rows)?;
        }
    }
    Ok(rows)
}

fn kind_of_association_rows<S: TripleSource + ?Sized>(
    source: &S,
    kind: &Iri,
) -> Result<Vec<QueryResult>, ChronicleError> {
    whole_rows(source, &participations(source, kind)?)
}

fn associated_rows<S: TripleSource + ?Sized>(
    source: &S,
    item: &Iri,
    kind: &Iri,
) -> Result<Vec<QueryResult>, ChronicleError> {
    let found = participations(source, kind)?;
    let linked = associations_of(&found, item);
    whole_rows(
        source,
        found
            .iter()
            .filter(|p| linked.contains(&p.association) && p.whole != *item),
    )
}

fn participant_detail_rows<S: TripleSource + ?Sized>(
    source: &S,
    first: &Iri,
    second: &Iri,
    kind: &Iri,
) -> Result<Vec<QueryResult>, ChronicleError> {
    let found = participations(source, kind)?;
    let of_first = associations_of(&found, first);
    let of_second = associations_of(&found, second);

    let mut rows = Vec::new();
    for participation in found.iter().filter(|p| {
        of_first.contains(&p.association)
            && of_second.contains(&p.association)
            && (p.whole == *first || p.whole == *second)
    }) {
        let participant = &participation.participant;
        participant_rows(source, participant, participant, &mut rows)?;
    }
    Ok(rows)
}

fn associations_of<'a>(found: &'a [Participation], individual: &Iri) -> BTreeSet<&'a Iri> {
    found
        .iter()
        .filter(|p| p.whole == *individual)
        .map(|p| &p.association)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
