//! # Sign Resolution Tests
//!
//! End-to-end lookups over an HQDM sign graph built with the schema
//! catalogue, run against both providers.

use chronicle_core::resolution::SignPattern;
use chronicle_core::vocab::{
    BEGINNING, ENDING, ENTITY_NAME, EVENT, MEMBER_OF, MEMBER_OF_, MEMBER_OF_KIND, PART__OF,
    PART_OF_POSSIBLE_WORLD, PARTICIPANT_IN, PATTERN, POINT_IN_TIME, POSSIBLE_WORLD,
    RECOGNIZING_LANGUAGE_COMMUNITY, REFERENCES, REPRESENTATION_BY_PATTERN, REPRESENTATION_BY_SIGN,
    REPRESENTS, SIGN, STATE_OF_PERSON, TEMPORAL_PART_OF, VALUE, term,
};
use chronicle_core::{
    ChronicleError, Iri, Session, StaticCatalogue, StorageBackend, Thing, ThingBuilder,
};

fn iri(s: &str) -> Iri {
    Iri::parse(format!("http://example.com/{s}")).expect("valid iri")
}

fn world() -> Iri {
    iri("world")
}

// =============================================================================
// FIXTURE
// =============================================================================

struct Binding<'a> {
    key: &'a str,
    community: &'a str,
    pattern: &'a str,
    value: &'a str,
    subject: &'a str,
    from: Option<&'a str>,
    until: Option<&'a str>,
}

/// The Things for one sign binding: sign, representation, events.
fn bind(catalogue: &StaticCatalogue, b: &Binding<'_>) -> Vec<Thing> {
    let sign = iri(&format!("{}-sign", b.key));
    let rep = iri(&format!("{}-rep", b.key));

    let mut things = vec![
        ThingBuilder::new(catalogue, term(SIGN), sign)
            .value(term(VALUE), b.value)
            .value(term(MEMBER_OF_), iri(b.pattern))
            .value(term(PARTICIPANT_IN), rep.clone())
            .build()
            .expect("sign"),
    ];

    let mut rep_builder = ThingBuilder::new(catalogue, term(REPRESENTATION_BY_SIGN), rep.clone())
        .value(term(REPRESENTS), iri(b.subject))
        .value(term(MEMBER_OF_), iri(&format!("{}-rbp", b.pattern)));
    for (predicate, suffix, ts) in [(BEGINNING, "begin", b.from), (ENDING, "end", b.until)] {
        let Some(ts) = ts else { continue };
        let event = iri(&format!("{}-{suffix}", b.key));
        rep_builder = rep_builder.value(term(predicate), event.clone());
        things.push(
            ThingBuilder::new(catalogue, term(EVENT), event)
                .value(term(ENTITY_NAME), ts)
                .value(term(PART_OF_POSSIBLE_WORLD), world())
                .build()
                .expect("event"),
        );
    }
    things.push(rep_builder.build().expect("rep"));

    // Communities may recognize several representations.
    things.push(Thing::new(iri(b.community)).with_value(term(PARTICIPANT_IN), rep));
    things
}

/// Two states of two different people share the surname "Smith" under
/// different registries; Alice Smith was known as "Ally" until 2015.
/// Alice's state is on the HR team and referenced by an audit. From 2012
/// another state of Alice is employed by Acme.
fn graph() -> Vec<Thing> {
    let catalogue = StaticCatalogue::hqdm();
    let mut things = vec![
        ThingBuilder::new(&catalogue, term(POSSIBLE_WORLD), world())
            .value(term(ENTITY_NAME), "real world")
            .build()
            .expect("world"),
    ];
    for (state, person) in [("alice-state", "alice"), ("bob-state", "bob")] {
        let mut builder = ThingBuilder::new(&catalogue, term(STATE_OF_PERSON), iri(state))
            .value(term(TEMPORAL_PART_OF), iri(person))
            .value(term(PART_OF_POSSIBLE_WORLD), world())
            .value(term(MEMBER_OF), iri("employee"));
        if person == "alice" {
            builder = builder
                .value(term(MEMBER_OF_KIND), iri("staff"))
                .value(term(PART__OF), iri("hr-team"));
        }
        things.push(builder.build().expect("state"));
    }
    things.push(Thing::new(iri("audit")).with_value(term(REFERENCES), iri("alice-state")));
    things.extend(employment(&catalogue));
    for pattern in ["surnames", "nicknames"] {
        things.push(
            ThingBuilder::new(&catalogue, term(PATTERN), iri(pattern))
                .value(term(ENTITY_NAME), pattern)
                .build()
                .expect("pattern"),
        );
        things.push(
            ThingBuilder::new(
                &catalogue,
                term(REPRESENTATION_BY_PATTERN),
                iri(&format!("{pattern}-rbp")),
            )
            .value(term(ENTITY_NAME), format!("{pattern} usage"))
            .build()
            .expect("rep by pattern"),
        );
    }
    things.push(
        ThingBuilder::new(&catalogue, term(RECOGNIZING_LANGUAGE_COMMUNITY), iri("hr"))
            .build()
            .expect("community"),
    );

    let bindings = [
        Binding {
            key: "a1",
            community: "hr",
            pattern: "surnames",
            value: "Smith",
            subject: "alice-state",
            from: Some("2010-01-01T00:00:00Z"),
            until: None,
        },
        Binding {
            key: "b1",
            community: "payroll",
            pattern: "nicknames",
            value: "Smith",
            subject: "bob-state",
            from: None,
            until: None,
        },
        Binding {
            key: "a2",
            community: "hr",
            pattern: "nicknames",
            value: "Ally",
            subject: "alice-state",
            from: Some("2010-01-01T00:00:00Z"),
            until: Some("2015-01-01T00:00:00Z"),
        },
    ];
    for binding in &bindings {
        things.extend(bind(&catalogue, binding));
    }
    things
}

/// Acme employs a state of Alice from 2012; Acme's side has no bounds.
fn employment(catalogue: &StaticCatalogue) -> Vec<Thing> {
    vec![
        Thing::new(iri("alice")).with_value(term(ENTITY_NAME), "Alice"),
        Thing::new(iri("acme")).with_value(term(ENTITY_NAME), "Acme"),
        Thing::new(iri("employee-role")).with_value(term(ENTITY_NAME), "employee role"),
        Thing::new(iri("employer-role")).with_value(term(ENTITY_NAME), "employer role"),
        Thing::new(iri("acme-job")).with_value(term(MEMBER_OF_KIND), iri("employment")),
        ThingBuilder::new(catalogue, term(STATE_OF_PERSON), iri("alice-at-acme"))
            .value(term(TEMPORAL_PART_OF), iri("alice"))
            .value(term(PART_OF_POSSIBLE_WORLD), world())
            .value(term(PARTICIPANT_IN), iri("acme-job"))
            .value(term(MEMBER_OF_KIND), iri("employee-role"))
            .value(term(BEGINNING), iri("hired"))
            .build()
            .expect("employee state"),
        ThingBuilder::new(catalogue, term(EVENT), iri("hired"))
            .value(term(ENTITY_NAME), "2012-01-01T00:00:00Z")
            .value(term(PART_OF_POSSIBLE_WORLD), world())
            .build()
            .expect("event"),
        Thing::new(iri("acme-as-employer"))
            .with_value(term(PARTICIPANT_IN), iri("acme-job"))
            .with_value(term(TEMPORAL_PART_OF), iri("acme"))
            .with_value(term(MEMBER_OF_KIND), iri("employer-role")),
    ]
}

fn point_in_time(ts: &str) -> Thing {
    ThingBuilder::new(&StaticCatalogue::hqdm(), term(POINT_IN_TIME), iri("now"))
        .value(term(ENTITY_NAME), ts)
        .value(term(PART_OF_POSSIBLE_WORLD), world())
        .build()
        .expect("point in time")
}

fn seeded(backend: StorageBackend) -> Session {
    let mut session = Session::new(backend);
    let things = graph();
    let transformation = session.create_transformation(&things);
    session
        .run_in_write_transaction(|s| s.apply_transformation(&transformation))
        .expect("seed");
    session
}

fn parents(things: &[Thing]) -> Vec<Iri> {
    things
        .iter()
        .flat_map(|t| t.iri_values(&term(TEMPORAL_PART_OF)).cloned().collect::<Vec<_>>())
        .collect()
}

// =============================================================================
// SCENARIOS
// =============================================================================

fn same_sign_under_two_authorities(session: &mut Session) {
    let now = point_in_time("2020-06-01T00:00:00Z");
    let (hr, payroll) = session
        .run_in_read_transaction(|s| {
            let hr = s.find_by_sign_value(&iri("hr"), &iri("surnames"), Some("Smith"), &now)?;
            let payroll =
                s.find_by_sign_value(&iri("payroll"), &iri("nicknames"), Some("Smith"), &now)?;
            Ok((hr, payroll))
        })
        .expect("resolve");

    assert_eq!(parents(&hr), vec![iri("alice")]);
    assert_eq!(parents(&payroll), vec![iri("bob")]);

    let crossed = session
        .run_in_read_transaction(|s| {
            s.find_by_sign_value(&iri("hr"), &iri("nicknames"), Some("Smith"), &now)
        })
        .expect("resolve");
    assert!(crossed.is_empty());
}

fn validity_window(session: &mut Session) {
    let lookup = |session: &mut Session, ts: &str| {
        let at = point_in_time(ts);
        session.run_in_read_transaction(|s| {
            s.find_by_partial_sign_value(&iri("hr"), &iri("nicknames"), Some("ALL"), &at)
        })
    };
    assert_eq!(lookup(session, "2012-06-01T00:00:00Z").expect("resolve").len(), 1);
    assert_eq!(lookup(session, "2015-01-01T00:00:00Z").expect("resolve").len(), 1);
    assert!(lookup(session, "2015-01-01T00:00:01Z").expect("resolve").is_empty());
    assert!(lookup(session, "2009-12-31T23:59:59Z").expect("resolve").is_empty());
}

fn signs_of_alice(session: &mut Session) {
    let signs_at = |session: &mut Session, ts: &str| {
        let at = point_in_time(ts);
        session.run_in_read_transaction(|s| s.find_signs_for_entity(&iri("alice-state"), &at))
    };

    let mut signs = signs_at(session, "2012-06-01T00:00:00Z").expect("signs");
    signs.sort_by(|a, b| a.sign_value.cmp(&b.sign_value));
    assert_eq!(
        signs,
        vec![
            SignPattern {
                sign_value: "Ally".to_string(),
                pattern_name: "nicknames".to_string(),
                rep_by_pattern_name: Some("nicknames usage".to_string()),
            },
            SignPattern {
                sign_value: "Smith".to_string(),
                pattern_name: "surnames".to_string(),
                rep_by_pattern_name: Some("surnames usage".to_string()),
            },
        ]
    );

    let later = signs_at(session, "2020-06-01T00:00:00Z").expect("signs");
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].sign_value, "Smith");
}

fn members_by_partial_sign(session: &mut Session) {
    let now = point_in_time("2020-06-01T00:00:00Z");
    let (insensitive, sensitive) = session
        .run_in_read_transaction(|s| {
            Ok((
                s.find_by_partial_sign_and_class("smi", &iri("employee"), &now)?,
                s.find_by_partial_sign_and_class_case_sensitive("smi", &iri("employee"), &now)?,
            ))
        })
        .expect("resolve");
    let mut ids: Vec<&Iri> = insensitive.iter().map(Thing::id).collect();
    ids.sort();
    assert_eq!(ids, vec![&iri("alice-state"), &iri("bob-state")]);
    assert!(sensitive.is_empty());
}

fn ids(things: &[Thing]) -> Vec<Iri> {
    let mut ids: Vec<Iri> = things.iter().map(|t| t.id().clone()).collect();
    ids.sort();
    ids
}

fn typed_members_by_sign_pattern(session: &mut Session) {
    let state = term(STATE_OF_PERSON);
    let lookup = |session: &mut Session, pattern: &str, ts: &str| {
        let at = point_in_time(ts);
        session.run_in_read_transaction(|s| {
            s.find_by_type_class_and_sign_pattern(&state, &iri("employee"), &iri(pattern), &at)
        })
    };
    assert_eq!(
        ids(&lookup(session, "surnames", "2020-06-01T00:00:00Z").expect("resolve")),
        vec![iri("alice-state")]
    );
    assert_eq!(
        ids(&lookup(session, "nicknames", "2012-06-01T00:00:00Z").expect("resolve")),
        vec![iri("alice-state"), iri("bob-state")]
    );
    assert_eq!(
        ids(&lookup(session, "nicknames", "2020-06-01T00:00:00Z").expect("resolve")),
        vec![iri("bob-state")]
    );

    let at = point_in_time("2012-06-01T00:00:00Z");
    let (staff, nobody) = session
        .run_in_read_transaction(|s| {
            Ok((
                s.find_by_type_kind_and_sign_pattern(&state, &iri("staff"), &iri("nicknames"), &at)?,
                s.find_by_type_kind_and_sign_pattern(&state, &iri("board"), &iri("nicknames"), &at)?,
            ))
        })
        .expect("resolve");
    assert_eq!(ids(&staff), vec![iri("alice-state")]);
    assert!(nobody.is_empty());
}

fn scoped_partial_sign_lookups(session: &mut Session) {
    let now = point_in_time("2020-06-01T00:00:00Z");
    let found = session
        .run_in_read_transaction(|s| {
            Ok([
                s.find_by_partial_sign_by_activity_reference_and_class(
                    &iri("audit"),
                    "smi",
                    &iri("employee"),
                    &now,
                )?,
                s.find_by_partial_sign_by_activity_reference_and_class_case_sensitive(
                    &iri("audit"),
                    "smi",
                    &iri("employee"),
                    &now,
                )?,
                s.find_by_partial_sign_composition_and_class(
                    &iri("hr-team"),
                    "SMITH",
                    &iri("employee"),
                    &now,
                )?,
                s.find_by_partial_sign_composition_and_class_case_sensitive(
                    &iri("hr-team"),
                    "Smi",
                    &iri("employee"),
                    &now,
                )?,
            ])
        })
        .expect("resolve");
    let [activity, activity_cased, whole, whole_cased] = found;
    assert_eq!(ids(&activity), vec![iri("alice-state")]);
    assert!(activity_cased.is_empty());
    assert_eq!(ids(&whole), vec![iri("alice-state")]);
    assert_eq!(ids(&whole_cased), vec![iri("alice-state")]);
}

fn associations(session: &mut Session) {
    let employment = iri("employment");
    let (employed, before) = session
        .run_in_read_transaction(|s| {
            Ok((
                s.find_by_kind_of_association(&employment, &point_in_time("2013-01-01T00:00:00Z"))?,
                s.find_by_kind_of_association(&employment, &point_in_time("2011-01-01T00:00:00Z"))?,
            ))
        })
        .expect("resolve");
    assert_eq!(ids(&employed), vec![iri("acme"), iri("alice")]);
    assert_eq!(ids(&before), vec![iri("acme")]);

    let (of_alice, of_acme, of_acme_early) = session
        .run_in_read_transaction(|s| {
            Ok((
                s.find_associated(&iri("alice"), &employment)?,
                s.find_associated(&iri("acme"), &employment)?,
                s.find_associated_at(
                    &iri("acme"),
                    &employment,
                    &point_in_time("2011-01-01T00:00:00Z"),
                )?,
            ))
        })
        .expect("resolve");
    assert_eq!(ids(&of_alice), vec![iri("acme")]);
    assert_eq!(ids(&of_acme), vec![iri("alice")]);
    assert!(of_acme_early.is_empty());

    let details = |session: &mut Session, ts: &str| {
        let at = point_in_time(ts);
        session.run_in_read_transaction(|s| {
            s.find_participant_details(&iri("alice"), &iri("acme"), &employment, &at)
        })
    };
    let mut both = details(session, "2013-01-01T00:00:00Z").expect("details");
    both.sort_by(|a, b| a.participant.id().cmp(b.participant.id()));
    let roles: Vec<(Iri, Vec<Iri>)> = both
        .iter()
        .map(|d| (d.participant.id().clone(), ids(&d.roles)))
        .collect();
    assert_eq!(
        roles,
        vec![
            (iri("acme-as-employer"), vec![iri("employer-role")]),
            (iri("alice-at-acme"), vec![iri("employee-role")]),
        ]
    );

    let early = details(session, "2011-01-01T00:00:00Z").expect("details");
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].participant.id(), &iri("acme-as-employer"));
}

fn entity_name_policy(session: &mut Session) {
    let found = session
        .find_by_entity_name_in_transaction(["real world"])
        .expect("found");
    assert_eq!(found["real world"].id(), &world());

    assert!(matches!(
        session.find_by_entity_name_in_transaction(["nobody"]),
        Err(ChronicleError::NotFound(_))
    ));
}

fn verify_catalogued_model(session: &mut Session) {
    let violations = session
        .verify_model(&StaticCatalogue::hqdm())
        .expect("verify");
    assert!(violations.is_empty(), "{violations:?}");
}

fn run_all(mut session: Session) {
    same_sign_under_two_authorities(&mut session);
    validity_window(&mut session);
    signs_of_alice(&mut session);
    members_by_partial_sign(&mut session);
    typed_members_by_sign_pattern(&mut session);
    scoped_partial_sign_lookups(&mut session);
    associations(&mut session);
    entity_name_policy(&mut session);
    verify_catalogued_model(&mut session);
}

#[test]
fn in_memory_provider() {
    run_all(seeded(StorageBackend::in_memory()));
}

#[test]
fn redb_provider() {
    let dir = tempfile::tempdir().expect("tempdir");
    run_all(seeded(
        StorageBackend::open_redb(dir.path().join("chronicle.redb")).expect("open"),
    ));
}
