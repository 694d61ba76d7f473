//! Rule-based inference as an injected capability.
//!
//! The core never reasons itself. A [`Reasoner`] is handed a snapshot of
//! Things and a rule set, and the session builds a fresh in-memory handle
//! from whatever it returns.

use crate::{ChronicleError, Iri, Thing};
use serde::{Deserialize, Serialize};

/// One finding of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReportEntry {
    /// The Thing the finding is about.
    pub subject: Iri,
    /// Short category, as reported by the reasoner.
    pub kind: String,
    /// Human-readable detail.
    pub detail: String,
}

/// An external rule engine.
pub trait Reasoner: Send + Sync {
    /// Apply `rules` to `things` and return the resulting graph.
    ///
    /// With `include_baseline` the reasoner also applies its own built-in
    /// rule set.
    fn infer(
        &self,
        things: &[Thing],
        rules: &str,
        include_baseline: bool,
    ) -> Result<Vec<Thing>, ChronicleError>;

    /// Check `things` against `rules` without changing them.
    fn validate(
        &self,
        things: &[Thing],
        rules: &str,
        include_baseline: bool,
    ) -> Result<Vec<ValidationReportEntry>, ChronicleError>;
}
