//! # Storage Module
//!
//! The graph store provider contract and the two reference providers.
//!
//! - [`GraphStore`]: transaction control, triple mutation, lookup and query
//!   execution
//! - [`MemoryStore`]: a `BTreeMap` with a copy-on-begin working set
//! - [`RedbStore`]: disk-backed, one postcard record per subject
//!
//! Every data operation requires an open transaction; writes require a write
//! transaction. Violations are returned as errors, never panics.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::assembly;
use crate::change::{ChangeSet, CreateOperation, DeleteOperation};
use crate::formats::{self, DumpFormat};
use crate::query::{Query, QueryResultList};
use crate::{ChronicleError, Iri, Thing, TransactionMode};
use std::io::{Read, Write};

/// Graph store provider.
///
/// Implementations must keep the `Thing` invariant: a subject with no
/// remaining values is not stored, and `get` returns `None` for it.
pub trait GraphStore {
    /// Open a read transaction.
    fn begin_read(&mut self) -> Result<(), ChronicleError>;

    /// Open a write transaction.
    fn begin_write(&mut self) -> Result<(), ChronicleError>;

    /// Commit the open transaction.
    fn commit(&mut self) -> Result<(), ChronicleError>;

    /// Abort the open transaction, discarding its writes.
    fn abort(&mut self) -> Result<(), ChronicleError>;

    /// The current transaction mode.
    fn mode(&self) -> TransactionMode;

    /// Look up a Thing by identifier.
    fn get(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError>;

    /// Add statements. Adding a statement that is present is a no-op.
    fn create_operations(&mut self, ops: &[CreateOperation]) -> Result<(), ChronicleError>;

    /// Remove statements. Removing a statement that is absent is a no-op.
    fn delete_operations(&mut self, ops: &[DeleteOperation]) -> Result<(), ChronicleError>;

    /// Remove everything.
    fn drop_all(&mut self) -> Result<(), ChronicleError>;

    /// Every stored Thing, in identifier order.
    fn things(&self) -> Result<Vec<Thing>, ChronicleError>;

    /// Run a query template.
    fn execute_query(&self, query: &Query) -> Result<QueryResultList, ChronicleError>;

    /// Store every value of a Thing.
    fn create(&mut self, thing: &Thing) -> Result<(), ChronicleError> {
        self.create_operations(ChangeSet::from_thing(thing).creates())
    }

    /// Replace the stored attribute map of a Thing with its current one.
    fn update(&mut self, thing: &Thing) -> Result<(), ChronicleError> {
        let old = self
            .get(thing.id())?
            .unwrap_or_else(|| Thing::new(thing.id().clone()));
        let change_set = ChangeSet::diff(&old, thing)?;
        self.delete_operations(change_set.deletes())?;
        self.create_operations(change_set.creates())
    }

    /// Remove every value of a Thing.
    fn delete(&mut self, thing: &Thing) -> Result<(), ChronicleError> {
        let deletes: Vec<DeleteOperation> = thing
            .triples()
            .map(|(p, v)| DeleteOperation::new(thing.id().clone(), p.clone(), v.clone()))
            .collect();
        self.delete_operations(&deletes)
    }

    /// Rebuild Things from (subject, predicate, object) rows.
    fn to_top_objects(&self, rows: &QueryResultList) -> Result<Vec<Thing>, ChronicleError> {
        assembly::to_top_objects(rows)
    }

    /// Write the store's contents.
    fn dump(&self, out: &mut dyn Write, format: DumpFormat) -> Result<(), ChronicleError> {
        formats::write_dump(&self.things()?, out, format)
    }

    /// Add the contents of a dump. Returns the number of triples read.
    fn load(&mut self, input: &mut dyn Read, format: DumpFormat) -> Result<usize, ChronicleError> {
        let ops = formats::read_dump(input, format)?;
        self.create_operations(&ops)?;
        Ok(ops.len())
    }
}

/// Shared transaction-state checks for providers.
pub(crate) fn require_open(
    mode: TransactionMode,
    operation: &'static str,
) -> Result<(), ChronicleError> {
    match mode {
        TransactionMode::Idle => Err(ChronicleError::TransactionState { operation, mode }),
        TransactionMode::Read | TransactionMode::Write => Ok(()),
    }
}

pub(crate) fn require_write(
    mode: TransactionMode,
    operation: &'static str,
) -> Result<(), ChronicleError> {
    match mode {
        TransactionMode::Idle => Err(ChronicleError::TransactionState { operation, mode }),
        TransactionMode::Read => Err(ChronicleError::ReadOnly),
        TransactionMode::Write => Ok(()),
    }
}

pub(crate) fn require_idle(
    mode: TransactionMode,
    operation: &'static str,
) -> Result<(), ChronicleError> {
    match mode {
        TransactionMode::Idle => Ok(()),
        TransactionMode::Read | TransactionMode::Write => {
            Err(ChronicleError::TransactionState { operation, mode })
        }
    }
}
