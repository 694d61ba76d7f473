//! # Applier Module
//!
//! Pushes a [`Transformation`] through a [`GraphStore`].
//!
//! The applier owns no transaction. It issues each change set's deletes and
//! then its creates, in order, and stops at the first provider error; the
//! enclosing write transaction makes the batch all-or-nothing.

use crate::storage::GraphStore;
use crate::{ChronicleError, Transformation};

/// Applies transformations to a provider.
pub struct TransformationApplier;

impl TransformationApplier {
    /// Apply every change set in order.
    pub fn apply<S: GraphStore + ?Sized>(
        transformation: &Transformation,
        store: &mut S,
    ) -> Result<(), ChronicleError> {
        for (index, change_set) in transformation.change_sets().iter().enumerate() {
            store.delete_operations(change_set.deletes())?;
            store.create_operations(change_set.creates())?;
            tracing::trace!(
                index,
                deletes = change_set.deletes().len(),
                creates = change_set.creates().len(),
                "change set applied"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::{ChangeSet, CreateOperation, DeleteOperation, Iri, Thing, Value};

    fn iri(s: &str) -> Iri {
        Iri::parse(format!("http://example.com/{s}")).expect("valid iri")
    }

    #[test]
    fn deletes_run_before_creates() {
        let mut store = MemoryStore::new();
        store.begin_write().expect("begin");
        store
            .create(&Thing::new(iri("a")).with_value(iri("p"), "v"))
            .expect("create");

        // The same triple is deleted and re-created in one change set.
        let t = Transformation::new(vec![ChangeSet::new(
            vec![DeleteOperation::new(iri("a"), iri("p"), "v")],
            vec![CreateOperation::new(iri("a"), iri("p"), "v")],
        )]);
        TransformationApplier::apply(&t, &mut store).expect("apply");

        let thing = store.get(&iri("a")).expect("get").expect("present");
        assert!(thing.has_this_value(&iri("p"), &Value::text("v")));
        store.commit().expect("commit");
    }

    #[test]
    fn apply_outside_transaction_fails() {
        let mut store = MemoryStore::new();
        let t = Transformation::from_things([&Thing::new(iri("a")).with_value(iri("p"), "v")]);
        assert!(matches!(
            TransformationApplier::apply(&t, &mut store),
            Err(ChronicleError::TransactionState { .. })
        ));
    }
}
