//! Integration tests for the Chronicle CLI.
//!
//! Most tests drive `cli::execute` in-process; a few run the built binary to
//! check exit codes and JSON output.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chronicle::cli::{self, Cli};
use chronicle::config::ChronicleConfig;
use chronicle_core::vocab::{
    BEGINNING, ENTITY_NAME, MEMBER_OF_, PARTICIPANT_IN, RDF_TYPE, REPRESENTS, VALUE, POINT_IN_TIME,
    term,
};
use chronicle_core::{ChronicleError, Iri, Thing, Transformation};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::Command;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn iri(s: &str) -> Iri {
    Iri::parse(format!("http://example.com/{s}")).unwrap()
}

/// Parse arguments and run them with flag-only configuration.
fn run(args: &[&str]) -> Result<(), ChronicleError> {
    let cli = Cli::try_parse_from(std::iter::once("chronicle").chain(args.iter().copied()))
        .unwrap();
    let config = ChronicleConfig::default().with_overrides(cli.database.clone(), cli.backend);
    cli::execute(cli, &config)
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// A sign "Smith" for `person` under `community`/`pattern`, valid from 2010.
fn sign_graph() -> Vec<Thing> {
    vec![
        Thing::new(iri("person")).with_value(term(ENTITY_NAME), "person one"),
        Thing::new(iri("sign"))
            .with_value(term(VALUE), "Smith")
            .with_value(term(MEMBER_OF_), iri("pattern"))
            .with_value(term(PARTICIPANT_IN), iri("rep")),
        Thing::new(iri("community")).with_value(term(PARTICIPANT_IN), iri("rep")),
        Thing::new(iri("rep"))
            .with_value(term(REPRESENTS), iri("person"))
            .with_value(term(BEGINNING), iri("begin")),
        Thing::new(iri("begin")).with_value(term(ENTITY_NAME), "2010-01-01T00:00:00Z"),
        Thing::new(iri("pattern")).with_value(term(ENTITY_NAME), "surnames"),
    ]
}

fn write_transformation(dir: &Path, things: &[Thing]) -> PathBuf {
    let path = dir.join("transformation.json");
    let transformation = Transformation::from_things(things);
    std::fs::write(&path, serde_json::to_vec(&transformation).unwrap()).unwrap();
    path
}

// =============================================================================
// IN-PROCESS TESTS
// =============================================================================

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("graph.redb");

    run(&["-D", path_str(&db), "init"]).unwrap();
    assert!(db.exists());
    assert!(matches!(
        run(&["-D", path_str(&db), "init"]),
        Err(ChronicleError::Storage(_))
    ));
    run(&["-D", path_str(&db), "init", "--force"]).unwrap();
}

#[test]
fn apply_then_get_on_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let transformation = write_transformation(dir.path(), &sign_graph());

    for (backend, name) in [("redb", "graph.redb"), ("file", "graph.chrx")] {
        let db = dir.path().join(name);
        let db = path_str(&db);
        run(&["-D", db, "-B", backend, "init"]).unwrap();
        run(&["-D", db, "-B", backend, "apply", "-f", path_str(&transformation)]).unwrap();
        run(&["-D", db, "-B", backend, "get", "http://example.com/person"]).unwrap();
        assert!(matches!(
            run(&["-D", db, "-B", backend, "get", "http://example.com/nobody"]),
            Err(ChronicleError::NotFound(_))
        ));
    }
}

#[test]
fn resolve_and_signs() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("graph.redb");
    let db = path_str(&db);
    let transformation = write_transformation(dir.path(), &sign_graph());
    run(&["-D", db, "apply", "-f", path_str(&transformation)]).unwrap();

    let resolve = |extra: &[&str]| {
        let mut args = vec![
            "-D",
            db,
            "resolve",
            "--community",
            "http://example.com/community",
            "--pattern",
            "http://example.com/pattern",
        ];
        args.extend_from_slice(extra);
        run(&args)
    };
    resolve(&["Smith", "--at", "2020-01-01T00:00:00Z"]).unwrap();
    resolve(&["smi", "--partial"]).unwrap();
    assert!(matches!(
        resolve(&["Smith", "--at", "yesterday"]),
        Err(ChronicleError::InvalidTimestamp(_))
    ));

    run(&["-D", db, "signs", "http://example.com/person", "--at", "2020-01-01T00:00:00Z"]).unwrap();
}

#[test]
fn export_import_and_verify_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.redb");
    let source = path_str(&source);
    let transformation = write_transformation(dir.path(), &sign_graph());
    run(&["-D", source, "apply", "-f", path_str(&transformation)]).unwrap();

    let nt = dir.path().join("graph.nt");
    let chrx = dir.path().join("graph.chrx");
    run(&["-D", source, "export", "-o", path_str(&nt)]).unwrap();
    run(&["-D", source, "export", "-o", path_str(&chrx)]).unwrap();
    assert!(std::fs::read_to_string(&nt).unwrap().contains("\"Smith\""));

    let copy = dir.path().join("copy.db");
    let copy = path_str(&copy);
    run(&["-D", copy, "-B", "file", "import", "-i", path_str(&nt)]).unwrap();
    run(&["-D", copy, "-B", "file", "verify", "--against", path_str(&chrx)]).unwrap();
    run(&["-D", copy, "-B", "file", "hash"]).unwrap();
}

#[test]
fn unknown_dump_extension_needs_format() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("graph.redb");
    let out = dir.path().join("graph.dump");
    assert!(matches!(
        run(&["-D", path_str(&db), "export", "-o", path_str(&out)]),
        Err(ChronicleError::Unsupported(_))
    ));
    run(&["-D", path_str(&db), "export", "-o", path_str(&out), "-t", "canonical"]).unwrap();
}

#[test]
fn verify_fails_on_schema_violation() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("graph.redb");
    let broken = vec![Thing::new(iri("now")).with_value(term(RDF_TYPE), term(POINT_IN_TIME))];
    let transformation = write_transformation(dir.path(), &broken);
    run(&["-D", path_str(&db), "apply", "-f", path_str(&transformation)]).unwrap();

    assert!(matches!(
        run(&["-D", path_str(&db), "verify"]),
        Err(ChronicleError::Storage(_))
    ));
}

// =============================================================================
// BINARY TESTS
// =============================================================================

fn chronicle(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chronicle"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn status_json_on_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let output = chronicle(dir.path())
        .args(["--json-mode", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["thing_count"], 0);
    assert_eq!(status["backend"], "redb");
    assert!(dir.path().join("chronicle.db").exists());
}

#[test]
fn config_file_in_working_directory_is_used() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("chronicle.toml"),
        "[storage]\ndatabase = \"from-config.chrx\"\nbackend = \"file\"\n",
    )
    .unwrap();

    let output = chronicle(dir.path())
        .args(["--json-mode", "init"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let init: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(init["backend"], "file");
    assert!(dir.path().join("from-config.chrx").exists());
}

#[test]
fn errors_exit_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = chronicle(dir.path())
        .args(["get", "http://example.com/missing"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No entity found"));

    let bad_config = chronicle(dir.path())
        .args(["--config", "absent.toml", "status"])
        .output()
        .unwrap();
    assert!(!bad_config.status.success());
}
