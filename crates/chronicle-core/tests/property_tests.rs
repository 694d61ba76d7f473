//! # Property-Based Tests
//!
//! Round-trip and interval invariants checked with proptest.

use chronicle_core::query::{FINISH, OBJECT, PREDICATE, START, SUBJECT};
use chronicle_core::{
    ChangeSet, Iri, QueryResult, QueryResultList, TemporalFilter, Thing, Timestamp, Value,
    to_top_objects,
};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

fn iri_strategy() -> impl Strategy<Value = Iri> {
    "[a-z]{1,8}".prop_map(|s| Iri::parse(format!("http://example.com/{s}")).expect("valid iri"))
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        iri_strategy().prop_map(Value::Iri),
        ".{0,16}".prop_map(Value::Text),
        any::<i64>().prop_map(Value::Integer),
        any::<bool>().prop_map(Value::Boolean),
    ]
}

fn thing_strategy() -> impl Strategy<Value = Thing> {
    (iri_strategy(), vec((iri_strategy(), value_strategy()), 1..12)).prop_map(|(id, pairs)| {
        pairs
            .into_iter()
            .fold(Thing::new(id), |thing, (p, v)| thing.with_value(p, v))
    })
}

/// Seconds in 1970..2100, as nanoseconds.
fn instant_strategy() -> impl Strategy<Value = Timestamp> {
    (0i64..4_102_444_800).prop_map(|secs| Timestamp::from_unix_nanos(i128::from(secs) * 1_000_000_000))
}

fn rows_for(thing: &Thing) -> QueryResultList {
    let rows = ChangeSet::from_thing(thing)
        .creates()
        .iter()
        .map(|op| {
            let t = op.triple();
            QueryResult::new()
                .with(SUBJECT, t.subject())
                .with(PREDICATE, t.predicate())
                .with(OBJECT, t.object().clone())
        })
        .collect();
    QueryResultList::new(
        vec![SUBJECT.to_string(), PREDICATE.to_string(), OBJECT.to_string()],
        rows,
    )
}

fn interval_row(start: Option<Timestamp>, finish: Option<Timestamp>) -> QueryResult {
    let mut row = QueryResult::new().with(SUBJECT, Iri::from_static("http://example.com/x"));
    if let Some(start) = start {
        row.bind(START, start.to_rfc3339().expect("format"));
    }
    if let Some(finish) = finish {
        row.bind(FINISH, finish.to_rfc3339().expect("format"));
    }
    row
}

fn retained(when: Timestamp, row: QueryResult) -> bool {
    let rows = QueryResultList::new(vec![SUBJECT.to_string()], vec![row]);
    !TemporalFilter::filter_by_instant(when, rows)
        .expect("filter")
        .is_empty()
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Assembling the creates of a Thing gives the Thing back.
    #[test]
    fn change_set_rows_reassemble_to_the_thing(thing in thing_strategy()) {
        let things = to_top_objects(&rows_for(&thing)).expect("assemble");
        prop_assert_eq!(things, vec![thing]);
    }

    /// Rows of several Things group by subject in first-seen order.
    #[test]
    fn assembly_yields_one_thing_per_subject(things in vec(thing_strategy(), 1..6)) {
        let mut names = Vec::new();
        let mut results = Vec::new();
        for thing in &things {
            let (vars, rows) = rows_for(thing).into_parts();
            names = vars;
            results.extend(rows);
        }
        let assembled = to_top_objects(&QueryResultList::new(names, results)).expect("assemble");

        let mut expected_ids: Vec<&Iri> = Vec::new();
        for thing in &things {
            if !expected_ids.contains(&thing.id()) {
                expected_ids.push(thing.id());
            }
        }
        let ids: Vec<&Iri> = assembled.iter().map(Thing::id).collect();
        prop_assert_eq!(ids, expected_ids);
    }

    /// A bounded row is retained iff start <= when <= finish.
    #[test]
    fn bounded_interval_membership(
        a in instant_strategy(),
        b in instant_strategy(),
        when in instant_strategy(),
    ) {
        let (start, finish) = if a <= b { (a, b) } else { (b, a) };
        let expected = start <= when && when <= finish;
        prop_assert_eq!(retained(when, interval_row(Some(start), Some(finish))), expected);
    }

    /// Both bounds are inclusive.
    #[test]
    fn boundaries_are_retained(a in instant_strategy(), b in instant_strategy()) {
        let (start, finish) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(retained(start, interval_row(Some(start), Some(finish))));
        prop_assert!(retained(finish, interval_row(Some(start), Some(finish))));
    }

    /// Open ends extend to the beginning and end of time.
    #[test]
    fn open_ended_intervals(bound in instant_strategy(), when in instant_strategy()) {
        prop_assert_eq!(retained(when, interval_row(Some(bound), None)), bound <= when);
        prop_assert_eq!(retained(when, interval_row(None, Some(bound))), when <= bound);
        prop_assert!(retained(when, interval_row(None, None)));
    }
}
