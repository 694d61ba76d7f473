//! In-memory graph store.
//!
//! Committed state is a `BTreeMap<Iri, Thing>`. A write transaction works on
//! a copy taken at `begin_write`; commit swaps it in, abort drops it.

use super::{GraphStore, require_idle, require_open, require_write};
use crate::change::{CreateOperation, DeleteOperation};
use crate::query::{Query, QueryResultList, TripleSource, evaluate};
use crate::{ChronicleError, Iri, Thing, TransactionMode};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Idle,
    Read,
    Write(BTreeMap<Iri, Thing>),
}

/// A volatile graph store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: BTreeMap<Iri, Thing>,
    state: State,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given Things. Things sharing an identifier
    /// are merged; empty Things are skipped.
    #[must_use]
    pub fn from_things(things: impl IntoIterator<Item = Thing>) -> Self {
        let mut committed: BTreeMap<Iri, Thing> = BTreeMap::new();
        for thing in things.into_iter().filter(|t| !t.is_empty()) {
            let merged = committed
                .entry(thing.id().clone())
                .or_insert_with(|| Thing::new(thing.id().clone()));
            for (predicate, value) in thing.triples() {
                merged.add_value(predicate.clone(), value.clone());
            }
        }
        Self {
            committed,
            state: State::Idle,
        }
    }

    /// Number of committed Things.
    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Check if nothing is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    fn view(&self, operation: &'static str) -> Result<&BTreeMap<Iri, Thing>, ChronicleError> {
        require_open(self.mode(), operation)?;
        match &self.state {
            State::Write(working) => Ok(working),
            State::Idle | State::Read => Ok(&self.committed),
        }
    }

    fn working(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut BTreeMap<Iri, Thing>, ChronicleError> {
        require_write(self.mode(), operation)?;
        match &mut self.state {
            State::Write(working) => Ok(working),
            State::Idle | State::Read => Err(ChronicleError::ReadOnly),
        }
    }
}

struct MapSource<'a>(&'a BTreeMap<Iri, Thing>);

impl TripleSource for MapSource<'_> {
    fn thing(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError> {
        Ok(self.0.get(id).cloned())
    }

    fn for_each_thing(
        &self,
        visit: &mut dyn FnMut(&Thing) -> Result<(), ChronicleError>,
    ) -> Result<(), ChronicleError> {
        for thing in self.0.values() {
            visit(thing)?;
        }
        Ok(())
    }
}

impl GraphStore for MemoryStore {
    fn begin_read(&mut self) -> Result<(), ChronicleError> {
        require_idle(self.mode(), "begin a read transaction")?;
        self.state = State::Read;
        Ok(())
    }

    fn begin_write(&mut self) -> Result<(), ChronicleError> {
        require_idle(self.mode(), "begin a write transaction")?;
        self.state = State::Write(self.committed.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ChronicleError> {
        require_open(self.mode(), "commit")?;
        if let State::Write(working) = std::mem::take(&mut self.state) {
            self.committed = working;
        }
        Ok(())
    }

    fn abort(&mut self) -> Result<(), ChronicleError> {
        require_open(self.mode(), "abort")?;
        self.state = State::Idle;
        Ok(())
    }

    fn mode(&self) -> TransactionMode {
        match self.state {
            State::Idle => TransactionMode::Idle,
            State::Read => TransactionMode::Read,
            State::Write(_) => TransactionMode::Write,
        }
    }

    fn get(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError> {
        Ok(self.view("get")?.get(id).cloned())
    }

    fn create_operations(&mut self, ops: &[CreateOperation]) -> Result<(), ChronicleError> {
        let working = self.working("create")?;
        for op in ops {
            let triple = op.triple();
            working
                .entry(triple.subject().clone())
                .or_insert_with(|| Thing::new(triple.subject().clone()))
                .add_value(triple.predicate().clone(), triple.object().clone());
        }
        Ok(())
    }

    fn delete_operations(&mut self, ops: &[DeleteOperation]) -> Result<(), ChronicleError> {
        let working = self.working("delete")?;
        for op in ops {
            let triple = op.triple();
            if let Some(thing) = working.get_mut(triple.subject()) {
                thing.remove_value(triple.predicate(), triple.object());
                if thing.is_empty() {
                    working.remove(triple.subject());
                }
            }
        }
        Ok(())
    }

    fn drop_all(&mut self) -> Result<(), ChronicleError> {
        self.working("drop all")?.clear();
        Ok(())
    }

    fn things(&self) -> Result<Vec<Thing>, ChronicleError> {
        Ok(self.view("list things")?.values().cloned().collect())
    }

    fn execute_query(&self, query: &Query) -> Result<QueryResultList, ChronicleError> {
        evaluate(&MapSource(self.view("execute a query")?), query)
    }
}
