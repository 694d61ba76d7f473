//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens its own session. With the `file` backend the store is
//! a canonical dump loaded into memory, and commands that write save it back.

use crate::config::{Backend, ChronicleConfig};
use chronicle_core::formats::canonical::{canonical_crypto_hash, verify_canonical};
use chronicle_core::vocab::{ENTITY_NAME, term};
use chronicle_core::{
    ChronicleError, DumpFormat, GraphStore, Iri, Session, StaticCatalogue, StorageBackend, Thing,
    Timestamp, Transformation, canonical_checksum,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a transformation file (100 MB).
const MAX_APPLY_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum size of an import file (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Identifier given to the point in time built from `--at`.
const POINT_IN_TIME_ID: &str = "urn:chronicle:point-in-time";

/// Shared state for one invocation.
#[derive(Debug)]
pub struct Context<'a> {
    pub config: &'a ChronicleConfig,
    pub json_mode: bool,
}

impl Context<'_> {
    fn database(&self) -> &Path {
        &self.config.storage.database
    }

    fn backend(&self) -> Backend {
        self.config.storage.backend
    }
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ChronicleError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ChronicleError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ChronicleError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, which must be an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ChronicleError> {
    let canonical = path.canonicalize().map_err(|e| {
        ChronicleError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ChronicleError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, ChronicleError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ChronicleError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ChronicleError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ChronicleError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) -> Result<(), ChronicleError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ChronicleError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ChronicleError> {
    serde_json::to_value(value).map_err(|e| ChronicleError::Serialization(e.to_string()))
}

fn dump_format(path: &Path, explicit: Option<DumpFormat>) -> Result<DumpFormat, ChronicleError> {
    explicit.or_else(|| DumpFormat::from_path(path)).ok_or_else(|| {
        ChronicleError::Unsupported(format!(
            "cannot tell the dump format of '{}'; use --format",
            path.display()
        ))
    })
}

/// A point-in-time entity for `--at`, or for now.
fn point_in_time(at: Option<&str>) -> Result<Thing, ChronicleError> {
    let text = match at {
        Some(text) => {
            Timestamp::parse(text)?;
            text.to_string()
        }
        None => Timestamp::now().to_rfc3339()?,
    };
    Ok(Thing::new(Iri::parse(POINT_IN_TIME_ID)?).with_value(term(ENTITY_NAME), text))
}

fn all_things(session: &mut Session) -> Result<Vec<Thing>, ChronicleError> {
    session.run_in_read_transaction(|s| s.store().things())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(ctx: &Context<'_>, force: bool) -> Result<(), ChronicleError> {
    let db_path = ctx.database();
    if db_path.exists() {
        if !force {
            return Err(ChronicleError::Storage(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)?;
    }

    let session = open_session(ctx)?;
    save_session(ctx, session)?;

    tracing::info!(database = %db_path.display(), backend = %ctx.backend(), "database initialized");
    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": ctx.backend().to_string(),
        }))?;
    } else {
        println!(
            "Initialized new {} database at {}",
            ctx.backend(),
            db_path.display()
        );
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(ctx: &Context<'_>) -> Result<(), ChronicleError> {
    let mut session = open_session(ctx)?;
    let things = all_things(&mut session)?;
    let triple_count: usize = things.iter().map(Thing::triple_count).sum();
    let checksum = canonical_checksum(&things);

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "database": ctx.database().to_string_lossy(),
            "backend": ctx.backend().to_string(),
            "thing_count": things.len(),
            "triple_count": triple_count,
            "checksum": checksum,
        }));
    }

    println!("Chronicle Store Status");
    println!("======================");
    println!("Database: {}", ctx.database().display());
    println!("Backend:  {}", ctx.backend());
    println!();
    println!("Things:   {}", things.len());
    println!("Triples:  {}", triple_count);
    println!("Checksum: {}", checksum);
    Ok(())
}

// =============================================================================
// GET COMMAND
// =============================================================================

/// Print one Thing.
pub fn cmd_get(ctx: &Context<'_>, id: &Iri) -> Result<(), ChronicleError> {
    let mut session = open_session(ctx)?;
    let thing = session
        .get_in_transaction(id)?
        .ok_or_else(|| ChronicleError::NotFound(id.to_string()))?;

    if ctx.json_mode {
        return print_json(&to_json(&thing)?);
    }

    println!("{}", thing.id());
    for (predicate, value) in thing.triples() {
        println!("  {} = {}", predicate, value);
    }
    Ok(())
}

// =============================================================================
// APPLY COMMAND
// =============================================================================

/// Apply a transformation from a JSON file in one write transaction.
pub fn cmd_apply(ctx: &Context<'_>, file: &Path) -> Result<(), ChronicleError> {
    let path = validate_file_path(file)?;
    validate_file_size(&path, MAX_APPLY_FILE_SIZE)?;

    let reader = BufReader::new(File::open(&path)?);
    let transformation: Transformation = serde_json::from_reader(reader)
        .map_err(|e| ChronicleError::Serialization(format!("Transformation: {e}")))?;

    let mut session = open_session(ctx)?;
    session.run_in_write_transaction(|s| s.apply_transformation(&transformation))?;
    save_session(ctx, session)?;

    let change_sets = transformation.change_sets().len();
    let operations = transformation.operation_count();
    tracing::info!(change_sets, operations, "transformation applied");

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "change_sets": change_sets,
            "operations": operations,
        }))
    } else {
        println!("Applied {change_sets} change sets ({operations} operations)");
        Ok(())
    }
}

// =============================================================================
// RESOLUTION COMMANDS
// =============================================================================

/// Find the Things a sign denotes.
pub fn cmd_resolve(
    ctx: &Context<'_>,
    community: &Iri,
    pattern: &Iri,
    value: &str,
    partial: bool,
    at: Option<&str>,
) -> Result<(), ChronicleError> {
    let when = point_in_time(at)?;
    let mut session = open_session(ctx)?;
    let things = session.run_in_read_transaction(|s| {
        if partial {
            s.find_by_partial_sign_value(community, pattern, Some(value), &when)
        } else {
            s.find_by_sign_value(community, pattern, Some(value), &when)
        }
    })?;

    if ctx.json_mode {
        return print_json(&to_json(&things)?);
    }

    if things.is_empty() {
        println!("No match for {:?}", value);
    }
    for thing in &things {
        println!("{}", thing.id());
        for (predicate, value) in thing.triples() {
            println!("  {} = {}", predicate, value);
        }
    }
    Ok(())
}

/// List the signs of a Thing.
pub fn cmd_signs(ctx: &Context<'_>, entity: &Iri, at: Option<&str>) -> Result<(), ChronicleError> {
    let when = point_in_time(at)?;
    let mut session = open_session(ctx)?;
    let signs = session.run_in_read_transaction(|s| s.find_signs_for_entity(entity, &when))?;

    if ctx.json_mode {
        return print_json(&to_json(&signs)?);
    }

    if signs.is_empty() {
        println!("No signs for {}", entity);
    }
    for sign in &signs {
        match &sign.rep_by_pattern_name {
            Some(rep) => println!("{} [{}; {}]", sign.sign_value, sign.pattern_name, rep),
            None => println!("{} [{}]", sign.sign_value, sign.pattern_name),
        }
    }
    Ok(())
}

// =============================================================================
// IMPORT / EXPORT COMMANDS
// =============================================================================

/// Load a dump.
pub fn cmd_import(
    ctx: &Context<'_>,
    input: &Path,
    format: Option<DumpFormat>,
) -> Result<(), ChronicleError> {
    let path = validate_file_path(input)?;
    validate_file_size(&path, MAX_IMPORT_FILE_SIZE)?;
    let format = dump_format(&path, format)?;

    let mut session = open_session(ctx)?;
    let mut reader = BufReader::new(File::open(&path)?);
    let count = session.import(&mut reader, format)?;
    save_session(ctx, session)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "triples": count, "format": format.to_string() }))
    } else {
        println!("Imported {count} triples ({format})");
        Ok(())
    }
}

/// Write a dump.
pub fn cmd_export(
    ctx: &Context<'_>,
    output: &Path,
    format: Option<DumpFormat>,
) -> Result<(), ChronicleError> {
    let path = validate_output_path(output)?;
    let format = dump_format(&path, format)?;

    let mut session = open_session(ctx)?;
    let mut writer = BufWriter::new(File::create(&path)?);
    session.export(&mut writer, format)?;

    let bytes = std::fs::metadata(&path)?.len();
    if ctx.json_mode {
        print_json(&serde_json::json!({
            "path": path.to_string_lossy(),
            "bytes": bytes,
            "format": format.to_string(),
        }))
    } else {
        println!("Exported {bytes} bytes to {}", path.display());
        Ok(())
    }
}

// =============================================================================
// VERIFY / HASH COMMANDS
// =============================================================================

/// Check the model, and optionally compare it with a canonical dump.
pub fn cmd_verify(ctx: &Context<'_>, against: Option<&Path>) -> Result<(), ChronicleError> {
    let mut session = open_session(ctx)?;
    let violations = session.verify_model(&StaticCatalogue::hqdm())?;

    let matches_dump = match against {
        Some(dump) => {
            let path = validate_file_path(dump)?;
            validate_file_size(&path, MAX_IMPORT_FILE_SIZE)?;
            let data = std::fs::read(&path)?;
            Some(verify_canonical(&all_things(&mut session)?, &data)?)
        }
        None => None,
    };

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "violations": to_json(&violations)?,
            "matches_dump": matches_dump,
        }))?;
    } else {
        for v in &violations {
            println!("{} ({}): {}", v.subject, v.kind.local_name(), v.message);
        }
        match matches_dump {
            Some(true) => println!("Store matches canonical dump"),
            Some(false) => println!("Store differs from canonical dump"),
            None => {}
        }
        if violations.is_empty() {
            println!("No schema violations");
        }
    }

    if !violations.is_empty() {
        return Err(ChronicleError::Storage(format!(
            "model verification failed: {} schema violations",
            violations.len()
        )));
    }
    if matches_dump == Some(false) {
        return Err(ChronicleError::Storage(
            "store differs from canonical dump".to_string(),
        ));
    }
    Ok(())
}

/// Print the BLAKE3 hash of the canonical dump.
pub fn cmd_hash(ctx: &Context<'_>) -> Result<(), ChronicleError> {
    let mut session = open_session(ctx)?;
    let things = all_things(&mut session)?;
    let hash = canonical_crypto_hash(&things)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "algorithm": "BLAKE3",
            "hash": hash,
            "thing_count": things.len(),
        }))
    } else {
        println!("BLAKE3: {hash}");
        Ok(())
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured store.
pub fn open_session(ctx: &Context<'_>) -> Result<Session, ChronicleError> {
    let db_path = ctx.database();
    match ctx.backend() {
        Backend::Redb => Ok(Session::new(StorageBackend::open_redb(db_path)?)),
        Backend::File => {
            let mut session = Session::new(StorageBackend::in_memory());
            if db_path.exists() {
                validate_file_size(db_path, MAX_IMPORT_FILE_SIZE)?;
                let mut reader = BufReader::new(File::open(db_path)?);
                session.import(&mut reader, DumpFormat::Canonical)?;
            }
            Ok(session)
        }
    }
}

/// Persist a session opened with [`open_session`].
pub fn save_session(ctx: &Context<'_>, mut session: Session) -> Result<(), ChronicleError> {
    if session.store().is_persistent() {
        return Ok(());
    }
    let mut writer = BufWriter::new(File::create(ctx.database())?);
    session.export(&mut writer, DumpFormat::Canonical)
}
