//! # Assembly Module
//!
//! Rebuilds Things from flat (subject, predicate, object) rows.
//!
//! Columns are positional: the first three variable names are the subject,
//! predicate and object. Extra columns (such as `start`/`finish`) are ignored.

use crate::query::QueryResultList;
use crate::{ChronicleError, Iri, Thing, Value};
use std::collections::BTreeMap;

/// Group rows into one Thing per distinct subject, in first-seen order.
///
/// Repeated (predicate, object) pairs for a subject collapse into one value.
pub fn to_top_objects(rows: &QueryResultList) -> Result<Vec<Thing>, ChronicleError> {
    let [subject_var, predicate_var, object_var] = match rows.var_names() {
        [s, p, o, ..] => [s, p, o],
        other => {
            return Err(ChronicleError::InvalidQueryResult(format!(
                "expected at least 3 columns, got {}",
                other.len()
            )));
        }
    };

    let mut index: BTreeMap<Iri, usize> = BTreeMap::new();
    let mut things: Vec<Thing> = Vec::new();

    for (row_no, row) in rows.results().iter().enumerate() {
        let column = |name: &String| {
            row.get(name).ok_or_else(|| {
                ChronicleError::InvalidQueryResult(format!("row {row_no}: ?{name} is unbound"))
            })
        };
        let subject = iri_column(column(subject_var)?, subject_var, row_no)?;
        let predicate = iri_column(column(predicate_var)?, predicate_var, row_no)?;
        let object = column(object_var)?.clone();

        let slot = *index.entry(subject.clone()).or_insert_with(|| {
            things.push(Thing::new(subject.clone()));
            things.len() - 1
        });
        things[slot].add_value(predicate.clone(), object);
    }

    Ok(things)
}

fn iri_column<'a>(value: &'a Value, name: &str, row_no: usize) -> Result<&'a Iri, ChronicleError> {
    value.as_iri().ok_or_else(|| {
        ChronicleError::InvalidQueryResult(format!(
            "row {row_no}: ?{name} must be an identifier, got {value}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{OBJECT, PREDICATE, QueryResult, SUBJECT};

    fn iri(s: &str) -> Iri {
        Iri::parse(format!("http://example.com/{s}")).expect("valid iri")
    }

    fn triple(s: &str, p: &str, o: impl Into<Value>) -> QueryResult {
        QueryResult::new()
            .with(SUBJECT, iri(s))
            .with(PREDICATE, iri(p))
            .with(OBJECT, o)
    }

    fn spo(rows: Vec<QueryResult>) -> QueryResultList {
        QueryResultList::new(vec!["s".into(), "p".into(), "o".into()], rows)
    }

    #[test]
    fn groups_by_subject_in_first_seen_order() {
        let things = to_top_objects(&spo(vec![
            triple("b", "p", "1"),
            triple("a", "p", "2"),
            triple("b", "q", "3"),
        ]))
        .expect("assemble");
        assert_eq!(things.len(), 2);
        assert_eq!(things[0].id(), &iri("b"));
        assert_eq!(things[0].triple_count(), 2);
        assert_eq!(things[1].id(), &iri("a"));
    }

    #[test]
    fn repeated_rows_collapse() {
        let things = to_top_objects(&spo(vec![triple("a", "p", "x"), triple("a", "p", "x")]))
            .expect("assemble");
        assert_eq!(things.len(), 1);
        assert_eq!(things[0].triple_count(), 1);
    }

    #[test]
    fn empty_rows_give_no_things() {
        assert!(to_top_objects(&spo(Vec::new())).expect("assemble").is_empty());
    }

    #[test]
    fn too_few_columns_is_an_error() {
        let rows = QueryResultList::new(vec!["s".into(), "p".into()], Vec::new());
        assert!(matches!(
            to_top_objects(&rows),
            Err(ChronicleError::InvalidQueryResult(_))
        ));
    }

    #[test]
    fn literal_subject_is_an_error() {
        let row = QueryResult::new()
            .with(SUBJECT, "not an iri")
            .with(PREDICATE, iri("p"))
            .with(OBJECT, 1i64);
        assert!(matches!(
            to_top_objects(&spo(vec![row])),
            Err(ChronicleError::InvalidQueryResult(_))
        ));
    }

    #[test]
    fn unbound_object_is_an_error() {
        let row = QueryResult::new().with(SUBJECT, iri("a")).with(PREDICATE, iri("p"));
        assert!(matches!(
            to_top_objects(&spo(vec![row])),
            Err(ChronicleError::InvalidQueryResult(_))
        ));
    }

    #[test]
    fn positional_columns_accept_other_names() {
        let row = QueryResult::new()
            .with("x", iri("a"))
            .with("y", iri("p"))
            .with("z", 7i64);
        let rows = QueryResultList::new(vec!["x".into(), "y".into(), "z".into()], vec![row]);
        let things = to_top_objects(&rows).expect("assemble");
        assert!(things[0].has_this_value(&iri("p"), &Value::Integer(7)));
    }
}
