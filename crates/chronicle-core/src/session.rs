//! # Session Module
//!
//! The transaction façade over a graph store.
//!
//! A `Session` owns one provider handle and its transaction state:
//! `Idle → Read → Idle` or `Idle → Write → Idle`. Beginning while a
//! transaction is open, or committing while idle, is an error and leaves the
//! state unchanged.
//!
//! ## Transaction Ownership
//!
//! Most operations run inside the caller's transaction and fail when none is
//! open. Operations named `*_in_transaction`, plus `export`, `import` and
//! `verify_model`, open and close their own. The `run_in_*` wrappers
//! guarantee the session is idle afterwards: on error they abort and return
//! the original error.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`] (volatile)
//! - `Persistent`: [`RedbStore`] (disk-backed ACID storage)

use crate::applier::TransformationApplier;
use crate::change::{CreateOperation, DeleteOperation, Transformation};
use crate::formats::DumpFormat;
use crate::inference::{Reasoner, ValidationReportEntry};
use crate::query::{Query, QueryResultList};
use crate::resolution::{ParticipantDetails, SignPattern, SignResolver};
use crate::schema::{self, SchemaCatalogue, SchemaViolation};
use crate::storage::{GraphStore, MemoryStore, RedbStore};
use crate::vocab::{ENTITY_NAME, MEMBER_OF, term};
use crate::{ChronicleError, Iri, Thing, TransactionMode, Value};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// An empty in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open or create a redb database at the given path.
    pub fn open_redb(path: impl AsRef<Path>) -> Result<Self, ChronicleError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

macro_rules! dispatch {
    ($self:expr, $store:ident => $body:expr) => {
        match $self {
            StorageBackend::InMemory($store) => $body,
            StorageBackend::Persistent($store) => $body,
        }
    };
}

impl GraphStore for StorageBackend {
    fn begin_read(&mut self) -> Result<(), ChronicleError> {
        dispatch!(self, s => s.begin_read())
    }

    fn begin_write(&mut self) -> Result<(), ChronicleError> {
        dispatch!(self, s => s.begin_write())
    }

    fn commit(&mut self) -> Result<(), ChronicleError> {
        dispatch!(self, s => s.commit())
    }

    fn abort(&mut self) -> Result<(), ChronicleError> {
        dispatch!(self, s => s.abort())
    }

    fn mode(&self) -> TransactionMode {
        dispatch!(self, s => s.mode())
    }

    fn get(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError> {
        dispatch!(self, s => s.get(id))
    }

    fn create_operations(&mut self, ops: &[CreateOperation]) -> Result<(), ChronicleError> {
        dispatch!(self, s => s.create_operations(ops))
    }

    fn delete_operations(&mut self, ops: &[DeleteOperation]) -> Result<(), ChronicleError> {
        dispatch!(self, s => s.delete_operations(ops))
    }

    fn drop_all(&mut self) -> Result<(), ChronicleError> {
        dispatch!(self, s => s.drop_all())
    }

    fn things(&self) -> Result<Vec<Thing>, ChronicleError> {
        dispatch!(self, s => s.things())
    }

    fn execute_query(&self, query: &Query) -> Result<QueryResultList, ChronicleError> {
        dispatch!(self, s => s.execute_query(query))
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A transaction-disciplined handle on a graph store.
///
/// Does not implement `Clone`: the provider handle is exclusively owned.
pub struct Session<S: GraphStore = StorageBackend> {
    store: S,
    reasoner: Option<Arc<dyn Reasoner>>,
}

impl<S: GraphStore + std::fmt::Debug> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("reasoner", &self.reasoner.is_some())
            .finish()
    }
}

impl<S: GraphStore> Session<S> {
    /// Wrap a provider.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            reasoner: None,
        }
    }

    /// Attach a reasoner for inference and validation.
    #[must_use]
    pub fn with_reasoner(mut self, reasoner: Arc<dyn Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    /// The underlying provider.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give up the session, returning the provider.
    pub fn into_store(self) -> S {
        self.store
    }

    // -------------------------------------------------------------------------
    // Transaction control
    // -------------------------------------------------------------------------

    pub fn begin_read(&mut self) -> Result<(), ChronicleError> {
        self.store.begin_read()?;
        tracing::debug!("read transaction started");
        Ok(())
    }

    pub fn begin_write(&mut self) -> Result<(), ChronicleError> {
        self.store.begin_write()?;
        tracing::debug!("write transaction started");
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), ChronicleError> {
        self.store.commit()?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    pub fn abort(&mut self) -> Result<(), ChronicleError> {
        self.store.abort()?;
        tracing::debug!("transaction aborted");
        Ok(())
    }

    /// The current transaction state.
    #[must_use]
    pub fn state(&self) -> TransactionMode {
        self.store.mode()
    }

    /// Run `f` in a read transaction.
    pub fn run_in_read_transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ChronicleError>,
    ) -> Result<T, ChronicleError> {
        self.begin_read()?;
        let result = f(self);
        self.finish(result)
    }

    /// Run `f` in a write transaction. Its writes are committed together or
    /// not at all.
    pub fn run_in_write_transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ChronicleError>,
    ) -> Result<T, ChronicleError> {
        self.begin_write()?;
        let result = f(self);
        self.finish(result)
    }

    fn finish<T>(&mut self, result: Result<T, ChronicleError>) -> Result<T, ChronicleError> {
        match result {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_error) = self.abort() {
                    tracing::warn!(error = %abort_error, "abort after failed transaction body failed");
                }
                Err(e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Data operations (caller's transaction)
    // -------------------------------------------------------------------------

    /// Look up a Thing.
    pub fn get(&self, id: &Iri) -> Result<Option<Thing>, ChronicleError> {
        self.store.get(id)
    }

    /// Persist every value of a new Thing.
    pub fn create(&mut self, thing: &Thing) -> Result<(), ChronicleError> {
        self.store.create(thing)
    }

    /// Replace the stored values of a Thing with its current ones.
    pub fn update(&mut self, thing: &Thing) -> Result<(), ChronicleError> {
        self.store.update(thing)
    }

    /// Remove every value of a Thing.
    pub fn delete(&mut self, thing: &Thing) -> Result<(), ChronicleError> {
        self.store.delete(thing)
    }

    pub fn delete_operations(&mut self, ops: &[DeleteOperation]) -> Result<(), ChronicleError> {
        self.store.delete_operations(ops)
    }

    /// Apply caller-computed deletes, then creates.
    pub fn update_operations(
        &mut self,
        deletes: &[DeleteOperation],
        creates: &[CreateOperation],
    ) -> Result<(), ChronicleError> {
        self.store.delete_operations(deletes)?;
        self.store.create_operations(creates)
    }

    /// One initial-persistence ChangeSet per Thing, in order.
    #[must_use]
    pub fn create_transformation<'a>(
        &self,
        things: impl IntoIterator<Item = &'a Thing>,
    ) -> Transformation {
        Transformation::from_things(things)
    }

    pub fn apply_transformation(
        &mut self,
        transformation: &Transformation,
    ) -> Result<(), ChronicleError> {
        TransformationApplier::apply(transformation, &mut self.store)
    }

    pub fn drop_all(&mut self) -> Result<(), ChronicleError> {
        self.store.drop_all()
    }

    pub fn execute_query(&self, query: &Query) -> Result<QueryResultList, ChronicleError> {
        self.store.execute_query(query)
    }

    /// Run a triple-shaped query and index the assembled Things by id.
    pub fn execute_query_for_things(
        &self,
        query: &Query,
    ) -> Result<BTreeMap<Iri, Thing>, ChronicleError> {
        Ok(self
            .find(query)?
            .into_iter()
            .map(|t| (t.id().clone(), t))
            .collect())
    }

    fn find(&self, query: &Query) -> Result<Vec<Thing>, ChronicleError> {
        let rows = self.store.execute_query(query)?;
        self.store.to_top_objects(&rows)
    }

    // -------------------------------------------------------------------------
    // Finders (caller's transaction)
    // -------------------------------------------------------------------------

    /// Things linked to `object` through `predicate`.
    pub fn find_by_predicate_iri(
        &self,
        predicate: &Iri,
        object: &Iri,
    ) -> Result<Vec<Thing>, ChronicleError> {
        self.find(&Query::by_predicate(
            predicate.clone(),
            Some(Value::from(object)),
        ))
    }

    /// Things holding any value for `predicate`.
    pub fn find_by_predicate_iri_only(&self, predicate: &Iri) -> Result<Vec<Thing>, ChronicleError> {
        self.find(&Query::by_predicate(predicate.clone(), None))
    }

    /// Things holding exactly `value` for `predicate`.
    pub fn find_by_predicate_iri_and_value(
        &self,
        predicate: &Iri,
        value: impl Into<Value>,
    ) -> Result<Vec<Thing>, ChronicleError> {
        self.find(&Query::by_predicate(predicate.clone(), Some(value.into())))
    }

    /// Things whose text value for `predicate` equals `text`, ignoring case.
    pub fn find_by_predicate_iri_and_string_case_insensitive(
        &self,
        predicate: &Iri,
        text: &str,
    ) -> Result<Vec<Thing>, ChronicleError> {
        self.find(&Query::by_predicate_text_case_insensitive(
            predicate.clone(),
            text,
        ))
    }

    /// Members of a class.
    pub fn find_by_class(&self, class: &Iri) -> Result<Vec<Thing>, ChronicleError> {
        self.find_by_predicate_iri(&term(MEMBER_OF), class)
    }

    /// Members of `class` holding `value` for `field`.
    pub fn find_by_field_value_and_class(
        &self,
        field: &Iri,
        value: impl Into<Value>,
        class: &Iri,
    ) -> Result<Vec<Thing>, ChronicleError> {
        self.find(&Query::by_field_value_and_class(
            field.clone(),
            value.into(),
            class.clone(),
        ))
    }

    /// The single Thing with this entity name.
    ///
    /// Zero matches is `NotFound`, more than one is `Ambiguous`.
    pub fn find_by_entity_name(&self, name: &str) -> Result<Thing, ChronicleError> {
        let mut found = self.find_by_predicate_iri_and_value(&term(ENTITY_NAME), name)?;
        match found.len() {
            0 => Err(ChronicleError::NotFound(name.to_string())),
            1 => found.pop().ok_or_else(|| ChronicleError::NotFound(name.to_string())),
            count => Err(ChronicleError::Ambiguous {
                name: name.to_string(),
                count,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Sign resolution (caller's transaction)
    // -------------------------------------------------------------------------

    /// See [`SignResolver::find_by_sign_value`].
    pub fn find_by_sign_value(
        &self,
        community: &Iri,
        pattern: &Iri,
        value: Option<&str>,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_sign_value(&self.store, community, pattern, value, point_in_time)
    }

    /// See [`SignResolver::find_by_partial_sign_value`].
    pub fn find_by_partial_sign_value(
        &self,
        community: &Iri,
        pattern: &Iri,
        text: Option<&str>,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_partial_sign_value(&self.store, community, pattern, text, point_in_time)
    }

    /// See [`SignResolver::find_signs_for_entity`].
    pub fn find_signs_for_entity(
        &self,
        entity: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<SignPattern>, ChronicleError> {
        SignResolver::find_signs_for_entity(&self.store, entity, point_in_time)
    }

    /// Members of `class` with a sign containing `text`, ignoring case.
    pub fn find_by_partial_sign_and_class(
        &self,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_partial_sign_and_class(&self.store, text, class, point_in_time, false)
    }

    /// Members of `class` with a sign containing `text`, matching case.
    pub fn find_by_partial_sign_and_class_case_sensitive(
        &self,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_partial_sign_and_class(&self.store, text, class, point_in_time, true)
    }

    /// See [`SignResolver::find_by_type_class_and_sign_pattern`].
    pub fn find_by_type_class_and_sign_pattern(
        &self,
        rdf_type: &Iri,
        class: &Iri,
        pattern: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_type_class_and_sign_pattern(
            &self.store,
            rdf_type,
            class,
            pattern,
            point_in_time,
        )
    }

    /// See [`SignResolver::find_by_type_kind_and_sign_pattern`].
    pub fn find_by_type_kind_and_sign_pattern(
        &self,
        rdf_type: &Iri,
        kind: &Iri,
        pattern: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_type_kind_and_sign_pattern(
            &self.store,
            rdf_type,
            kind,
            pattern,
            point_in_time,
        )
    }

    /// Members of `class` referenced by `activity` with a sign containing
    /// `text`, ignoring case.
    pub fn find_by_partial_sign_by_activity_reference_and_class(
        &self,
        activity: &Iri,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_partial_sign_by_activity_reference_and_class(
            &self.store,
            activity,
            text,
            class,
            point_in_time,
            false,
        )
    }

    /// Members of `class` referenced by `activity` with a sign containing
    /// `text`, matching case.
    pub fn find_by_partial_sign_by_activity_reference_and_class_case_sensitive(
        &self,
        activity: &Iri,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_partial_sign_by_activity_reference_and_class(
            &self.store,
            activity,
            text,
            class,
            point_in_time,
            true,
        )
    }

    /// Members of `class` that are parts of `whole` with a sign containing
    /// `text`, ignoring case.
    pub fn find_by_partial_sign_composition_and_class(
        &self,
        whole: &Iri,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_partial_sign_composition_and_class(
            &self.store,
            whole,
            text,
            class,
            point_in_time,
            false,
        )
    }

    /// Members of `class` that are parts of `whole` with a sign containing
    /// `text`, matching case.
    pub fn find_by_partial_sign_composition_and_class_case_sensitive(
        &self,
        whole: &Iri,
        text: &str,
        class: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_partial_sign_composition_and_class(
            &self.store,
            whole,
            text,
            class,
            point_in_time,
            true,
        )
    }

    /// See [`SignResolver::find_by_kind_of_association`].
    pub fn find_by_kind_of_association(
        &self,
        kind: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_by_kind_of_association(&self.store, kind, point_in_time)
    }

    /// See [`SignResolver::find_associated`].
    pub fn find_associated(&self, item: &Iri, kind: &Iri) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_associated(&self.store, item, kind)
    }

    /// See [`SignResolver::find_associated_at`].
    pub fn find_associated_at(
        &self,
        item: &Iri,
        kind: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<Thing>, ChronicleError> {
        SignResolver::find_associated_at(&self.store, item, kind, point_in_time)
    }

    /// See [`SignResolver::find_participant_details`].
    pub fn find_participant_details(
        &self,
        first: &Iri,
        second: &Iri,
        kind: &Iri,
        point_in_time: &Thing,
    ) -> Result<Vec<ParticipantDetails>, ChronicleError> {
        SignResolver::find_participant_details(&self.store, first, second, kind, point_in_time)
    }

    // -------------------------------------------------------------------------
    // Self-contained operations
    // -------------------------------------------------------------------------

    /// [`Session::get`] in its own read transaction.
    pub fn get_in_transaction(&mut self, id: &Iri) -> Result<Option<Thing>, ChronicleError> {
        self.run_in_read_transaction(|s| s.get(id))
    }

    /// Look up several entity names at once. Each must match exactly one Thing.
    pub fn find_by_entity_name_in_transaction<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeMap<String, Thing>, ChronicleError> {
        self.run_in_read_transaction(|s| {
            names
                .into_iter()
                .map(|name| Ok((name.to_string(), s.find_by_entity_name(name)?)))
                .collect()
        })
    }

    pub fn find_by_predicate_iri_in_transaction(
        &mut self,
        predicate: &Iri,
        object: &Iri,
    ) -> Result<Vec<Thing>, ChronicleError> {
        self.run_in_read_transaction(|s| s.find_by_predicate_iri(predicate, object))
    }

    pub fn find_by_predicate_iri_and_value_in_transaction(
        &mut self,
        predicate: &Iri,
        value: impl Into<Value>,
    ) -> Result<Vec<Thing>, ChronicleError> {
        let value = value.into();
        self.run_in_read_transaction(|s| s.find_by_predicate_iri_and_value(predicate, value))
    }

    /// Write every stored Thing in `format`.
    pub fn export(&mut self, out: &mut dyn Write, format: DumpFormat) -> Result<(), ChronicleError> {
        self.run_in_read_transaction(|s| s.store.dump(out, format))
    }

    /// Add the contents of a dump. Returns the number of triples read.
    pub fn import(
        &mut self,
        input: &mut dyn Read,
        format: DumpFormat,
    ) -> Result<usize, ChronicleError> {
        let count = self.run_in_write_transaction(|s| s.store.load(input, format))?;
        tracing::info!(count, %format, "dump imported");
        Ok(count)
    }

    /// Stored Things that break their kind's rules.
    pub fn verify_model(
        &mut self,
        catalogue: &dyn SchemaCatalogue,
    ) -> Result<Vec<SchemaViolation>, ChronicleError> {
        let things = self.run_in_read_transaction(|s| s.store.things())?;
        Ok(schema::verify(catalogue, &things))
    }

    // -------------------------------------------------------------------------
    // Inference
    // -------------------------------------------------------------------------

    /// Run the attached reasoner over the Things matched by `base` and return
    /// the result as a new in-memory session.
    pub fn apply_inference_rules(
        &mut self,
        base: &Query,
        rules: &str,
        include_baseline: bool,
    ) -> Result<Session<MemoryStore>, ChronicleError> {
        let reasoner = self.reasoner("inference")?;
        let things = self.run_in_read_transaction(|s| s.find(base))?;
        let inferred = reasoner.infer(&things, rules, include_baseline)?;
        tracing::debug!(
            input = things.len(),
            output = inferred.len(),
            "inference rules applied"
        );
        Ok(Session {
            store: MemoryStore::from_things(inferred),
            reasoner: Some(reasoner),
        })
    }

    /// Validate the Things matched by `base` with the attached reasoner.
    pub fn validate(
        &mut self,
        base: &Query,
        rules: &str,
        include_baseline: bool,
    ) -> Result<Vec<ValidationReportEntry>, ChronicleError> {
        let reasoner = self.reasoner("validation")?;
        let things = self.run_in_read_transaction(|s| s.find(base))?;
        reasoner.validate(&things, rules, include_baseline)
    }

    fn reasoner(&self, capability: &str) -> Result<Arc<dyn Reasoner>, ChronicleError> {
        self.reasoner
            .clone()
            .ok_or_else(|| ChronicleError::Unsupported(format!("{capability} needs a reasoner")))
    }
}

impl Default for Session<StorageBackend> {
    fn default() -> Self {
        Self::new(StorageBackend::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
