//! # chronicle-core
//!
//! Versioned, time-indexed knowledge graph core - THE LOGIC.
//!
//! Entities ("Things") carry multi-valued typed attributes and are never
//! edited in place: every mutation is a [`Transformation`] of ordered
//! [`ChangeSet`]s applied inside one write transaction. On top of that model
//! sits sign resolution: finding the Things a symbol denotes at a point in
//! time, filtered by the validity interval of each representation.
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Storage sits behind the [`GraphStore`] trait; two reference providers
//!   ship here (in-memory and redb)
//! - Deterministic ordering: `BTreeMap`/`BTreeSet` only, no floats
//! - Inference is an injected [`Reasoner`], never implemented here
//! - Errors are returned, never panicked

// =============================================================================
// MODULES
// =============================================================================

pub mod applier;
pub mod assembly;
pub mod change;
pub mod formats;
pub mod inference;
pub mod primitives;
pub mod query;
pub mod resolution;
pub mod schema;
pub mod session;
pub mod storage;
pub mod temporal;
pub mod types;
pub mod vocab;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ChronicleError, Iri, Thing, TransactionMode, Value};

// =============================================================================
// RE-EXPORTS: Change Model
// =============================================================================

pub use applier::TransformationApplier;
pub use change::{
    ChangeOperation, ChangeSet, CreateOperation, DeleteOperation, Transformation, Triple,
};

// =============================================================================
// RE-EXPORTS: Query, Time and Resolution
// =============================================================================

pub use assembly::to_top_objects;
pub use query::{Query, QueryResult, QueryResultList, QueryType};
pub use resolution::{ParticipantDetails, SignPattern, SignResolver};
pub use temporal::{Interval, TemporalFilter, Timestamp};

// =============================================================================
// RE-EXPORTS: Storage and Session
// =============================================================================

pub use inference::{Reasoner, ValidationReportEntry};
pub use schema::{SchemaCatalogue, StaticCatalogue, ThingBuilder};
pub use session::{Session, StorageBackend};
pub use storage::{GraphStore, MemoryStore, RedbStore};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::DumpFormat;
pub use formats::canonical::{
    CanonicalDump, CanonicalHeader, canonical_checksum, export_canonical, import_canonical,
    verify_canonical,
};
