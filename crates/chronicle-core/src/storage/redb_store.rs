//! # redb-backed Graph Storage
//!
//! A disk-backed graph store using the redb embedded database.
//!
//! Each subject is one record in the `things` table: the subject IRI maps to
//! the postcard encoding of the whole Thing. redb supplies the transaction
//! semantics directly:
//! - ACID commit and abort
//! - Crash safety (copy-on-write B-trees)
//! - Writes visible to later reads in the same write transaction

use super::{GraphStore, require_idle};
use crate::change::{CreateOperation, DeleteOperation, Triple};
use crate::query::{Query, QueryResultList, TripleSource, evaluate};
use crate::{ChronicleError, Iri, Thing, TransactionMode};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, Table, TableDefinition,
    WriteTransaction,
};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for things: subject IRI -> serialized Thing bytes
const THINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("things");

enum Active {
    Read(ReadTransaction),
    Write(WriteTransaction),
}

/// A disk-backed graph store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// The open transaction, if any.
    active: Option<Active>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

fn storage_error(e: impl std::fmt::Display) -> ChronicleError {
    ChronicleError::Storage(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<Thing, ChronicleError> {
    postcard::from_bytes(bytes).map_err(|e| ChronicleError::Serialization(e.to_string()))
}

fn read_thing<T>(table: &T, id: &Iri) -> Result<Option<Thing>, ChronicleError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(id.as_str()).map_err(storage_error)? {
        Some(guard) => decode(guard.value()).map(Some),
        None => Ok(None),
    }
}

fn write_thing(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    thing: &Thing,
) -> Result<(), ChronicleError> {
    let bytes =
        postcard::to_allocvec(thing).map_err(|e| ChronicleError::Serialization(e.to_string()))?;
    table
        .insert(thing.id().as_str(), bytes.as_slice())
        .map_err(storage_error)?;
    Ok(())
}

/// Group statements by subject so each record is decoded and written once.
fn by_subject<'a>(triples: impl Iterator<Item = &'a Triple>) -> BTreeMap<&'a Iri, Vec<&'a Triple>> {
    let mut grouped: BTreeMap<&Iri, Vec<&Triple>> = BTreeMap::new();
    for triple in triples {
        grouped.entry(triple.subject()).or_default().push(triple);
    }
    grouped
}

struct TableSource<'t, T>(&'t T);

impl<T> TripleSource for TableSource<'_, T>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    fn thing(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError> {
        read_thing(self.0, id)
    }

    fn for_each_thing(
        &self,
        visit: &mut dyn FnMut(&Thing) -> Result<(), ChronicleError>,
    ) -> Result<(), ChronicleError> {
        for entry in self.0.iter().map_err(storage_error)? {
            let (_, value) = entry.map_err(storage_error)?;
            visit(&decode(value.value())?)?;
        }
        Ok(())
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ChronicleError> {
        let db = Database::create(path.as_ref()).map_err(storage_error)?;

        // Initialize the table so read transactions can always open it
        {
            let write_txn = db.begin_write().map_err(storage_error)?;
            let _ = write_txn.open_table(THINGS).map_err(storage_error)?;
            write_txn.commit().map_err(storage_error)?;
        }

        tracing::debug!(path = %path.as_ref().display(), "redb store opened");
        Ok(Self { db, active: None })
    }

    /// Run `f` against the things table of the open transaction.
    fn with_source<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&dyn TripleSource) -> Result<R, ChronicleError>,
    ) -> Result<R, ChronicleError> {
        match &self.active {
            None => Err(ChronicleError::TransactionState {
                operation,
                mode: TransactionMode::Idle,
            }),
            Some(Active::Read(txn)) => {
                let table = txn.open_table(THINGS).map_err(storage_error)?;
                f(&TableSource(&table))
            }
            Some(Active::Write(txn)) => {
                let table = txn.open_table(THINGS).map_err(storage_error)?;
                f(&TableSource(&table))
            }
        }
    }

    fn write_txn(&self, operation: &'static str) -> Result<&WriteTransaction, ChronicleError> {
        match &self.active {
            None => Err(ChronicleError::TransactionState {
                operation,
                mode: TransactionMode::Idle,
            }),
            Some(Active::Read(_)) => Err(ChronicleError::ReadOnly),
            Some(Active::Write(txn)) => Ok(txn),
        }
    }
}

impl GraphStore for RedbStore {
    fn begin_read(&mut self) -> Result<(), ChronicleError> {
        require_idle(self.mode(), "begin a read transaction")?;
        let txn = self.db.begin_read().map_err(storage_error)?;
        self.active = Some(Active::Read(txn));
        Ok(())
    }

    fn begin_write(&mut self) -> Result<(), ChronicleError> {
        require_idle(self.mode(), "begin a write transaction")?;
        let txn = self.db.begin_write().map_err(storage_error)?;
        self.active = Some(Active::Write(txn));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ChronicleError> {
        match self.active.take() {
            None => Err(ChronicleError::TransactionState {
                operation: "commit",
                mode: TransactionMode::Idle,
            }),
            Some(Active::Read(txn)) => {
                drop(txn);
                Ok(())
            }
            Some(Active::Write(txn)) => txn.commit().map_err(storage_error),
        }
    }

    fn abort(&mut self) -> Result<(), ChronicleError> {
        match self.active.take() {
            None => Err(ChronicleError::TransactionState {
                operation: "abort",
                mode: TransactionMode::Idle,
            }),
            Some(Active::Read(txn)) => {
                drop(txn);
                Ok(())
            }
            Some(Active::Write(txn)) => txn.abort().map_err(storage_error),
        }
    }

    fn mode(&self) -> TransactionMode {
        match self.active {
            None => TransactionMode::Idle,
            Some(Active::Read(_)) => TransactionMode::Read,
            Some(Active::Write(_)) => TransactionMode::Write,
        }
    }

    fn get(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError> {
        self.with_source("get", |source| source.thing(id))
    }

    fn create_operations(&mut self, ops: &[CreateOperation]) -> Result<(), ChronicleError> {
        let txn = self.write_txn("create")?;
        let mut table = txn.open_table(THINGS).map_err(storage_error)?;
        for (subject, triples) in by_subject(ops.iter().map(CreateOperation::triple)) {
            let mut thing =
                read_thing(&table, subject)?.unwrap_or_else(|| Thing::new(subject.clone()));
            for triple in triples {
                thing.add_value(triple.predicate().clone(), triple.object().clone());
            }
            write_thing(&mut table, &thing)?;
        }
        Ok(())
    }

    fn delete_operations(&mut self, ops: &[DeleteOperation]) -> Result<(), ChronicleError> {
        let txn = self.write_txn("delete")?;
        let mut table = txn.open_table(THINGS).map_err(storage_error)?;
        for (subject, triples) in by_subject(ops.iter().map(DeleteOperation::triple)) {
            let Some(mut thing) = read_thing(&table, subject)? else {
                continue;
            };
            for triple in triples {
                thing.remove_value(triple.predicate(), triple.object());
            }
            if thing.is_empty() {
                table.remove(subject.as_str()).map_err(storage_error)?;
            } else {
                write_thing(&mut table, &thing)?;
            }
        }
        Ok(())
    }

    fn drop_all(&mut self) -> Result<(), ChronicleError> {
        let txn = self.write_txn("drop all")?;
        let mut table = txn.open_table(THINGS).map_err(storage_error)?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(storage_error)? {
            let (key, _) = entry.map_err(storage_error)?;
            keys.push(key.value().to_string());
        }
        for key in &keys {
            table.remove(key.as_str()).map_err(storage_error)?;
        }
        tracing::debug!(removed = keys.len(), "redb store cleared");
        Ok(())
    }

    fn things(&self) -> Result<Vec<Thing>, ChronicleError> {
        self.with_source("list things", |source| {
            let mut things = Vec::new();
            source.for_each_thing(&mut |thing| {
                things.push(thing.clone());
                Ok(())
            })?;
            Ok(things)
        })
    }

    fn execute_query(&self, query: &Query) -> Result<QueryResultList, ChronicleError> {
        self.with_source("execute a query", |source| evaluate(source, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use tempfile::tempdir;

    fn iri(s: &str) -> Iri {
        Iri::parse(format!("http://example.com/{s}")).expect("valid iri")
    }

    fn alice() -> Thing {
        Thing::new(iri("alice"))
            .with_value(iri("name"), "Alice")
            .with_value(iri("age"), 30i64)
    }

    #[test]
    fn basic_operations() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("test.redb")).expect("open");

        store.begin_write().expect("begin");
        store.create(&alice()).expect("create");
        assert_eq!(store.get(&iri("alice")).expect("get"), Some(alice()));
        store.commit().expect("commit");

        store.begin_read().expect("begin");
        assert_eq!(store.things().expect("things").len(), 1);
        store.commit().expect("commit");
    }

    #[test]
    fn recovery_persistence_after_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("persist.redb");
        {
            let mut store = RedbStore::open(&path).expect("open");
            store.begin_write().expect("begin");
            store.create(&alice()).expect("create");
            store.commit().expect("commit");
        }
        let mut store = RedbStore::open(&path).expect("reopen");
        store.begin_read().expect("begin");
        assert_eq!(store.get(&iri("alice")).expect("get"), Some(alice()));
        store.commit().expect("commit");
    }

    #[test]
    fn abort_discards_writes() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("abort.redb")).expect("open");
        store.begin_write().expect("begin");
        store.create(&alice()).expect("create");
        store.abort().expect("abort");

        store.begin_read().expect("begin");
        assert_eq!(store.get(&iri("alice")).expect("get"), None);
        store.commit().expect("commit");
    }

    #[test]
    fn read_transaction_rejects_writes() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("ro.redb")).expect("open");
        store.begin_read().expect("begin");
        assert!(matches!(store.create(&alice()), Err(ChronicleError::ReadOnly)));
        assert!(matches!(
            store.begin_write(),
            Err(ChronicleError::TransactionState { .. })
        ));
        store.abort().expect("abort");
        assert!(matches!(
            store.get(&iri("alice")),
            Err(ChronicleError::TransactionState { .. })
        ));
    }

    #[test]
    fn deleting_last_value_removes_record() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("delete.redb")).expect("open");
        store.begin_write().expect("begin");
        store.create(&alice()).expect("create");
        store.delete(&alice()).expect("delete");
        assert_eq!(store.get(&iri("alice")).expect("get"), None);
        assert!(store.things().expect("things").is_empty());
        store.commit().expect("commit");
    }

    #[test]
    fn update_and_drop_all() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("update.redb")).expect("open");
        store.begin_write().expect("begin");
        store.create(&alice()).expect("create");
        let older = Thing::new(iri("alice"))
            .with_value(iri("name"), "Alice")
            .with_value(iri("age"), 31i64);
        store.update(&older).expect("update");
        let stored = store.get(&iri("alice")).expect("get").expect("present");
        assert!(stored.has_this_value(&iri("age"), &Value::Integer(31)));
        assert!(!stored.has_this_value(&iri("age"), &Value::Integer(30)));

        store.drop_all().expect("drop");
        assert!(store.things().expect("things").is_empty());
        store.commit().expect("commit");
    }

    #[test]
    fn query_sees_uncommitted_writes() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("query.redb")).expect("open");
        store.begin_write().expect("begin");
        store.create(&alice()).expect("create");
        let rows = store
            .execute_query(&Query::by_predicate(iri("name"), Some(Value::text("Alice"))))
            .expect("query");
        assert_eq!(rows.len(), 2);
        store.commit().expect("commit");
    }
}
