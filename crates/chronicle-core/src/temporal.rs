//! # Temporal Module
//!
//! Instants, validity intervals, and the interval-membership filter applied to
//! query rows.
//!
//! Intervals are closed: both `start` and `finish` are inclusive. A missing
//! bound is open (`Timestamp::MIN` / `Timestamp::MAX`), so a row with neither
//! column is valid at every instant. Every time-scoped query result in the
//! crate goes through [`TemporalFilter::filter_by_instant`].

use crate::query::{FINISH, QueryResult, QueryResultList, START};
use crate::vocab::{ENTITY_NAME, term};
use crate::{ChronicleError, Thing, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// =============================================================================
// TIMESTAMP
// =============================================================================

/// A UTC instant as nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i128);

impl Timestamp {
    /// The open lower bound.
    pub const MIN: Self = Self(i128::MIN);

    /// The open upper bound.
    pub const MAX: Self = Self(i128::MAX);

    /// Create from nanoseconds since the Unix epoch.
    #[must_use]
    pub const fn from_unix_nanos(nanos: i128) -> Self {
        Self(nanos)
    }

    /// Nanoseconds since the Unix epoch.
    #[must_use]
    pub const fn unix_nanos(self) -> i128 {
        self.0
    }

    /// The current instant.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc().unix_timestamp_nanos())
    }

    /// Parse an RFC 3339 timestamp such as `2024-03-01T12:00:00Z`.
    pub fn parse(s: &str) -> Result<Self, ChronicleError> {
        OffsetDateTime::parse(s.trim(), &Rfc3339)
            .map(|dt| Self(dt.unix_timestamp_nanos()))
            .map_err(|e| ChronicleError::InvalidTimestamp(format!("{s:?}: {e}")))
    }

    /// Format as RFC 3339. Open bounds have no textual form.
    pub fn to_rfc3339(self) -> Result<String, ChronicleError> {
        OffsetDateTime::from_unix_timestamp_nanos(self.0)
            .map_err(|e| ChronicleError::InvalidTimestamp(e.to_string()))?
            .format(&Rfc3339)
            .map_err(|e| ChronicleError::InvalidTimestamp(e.to_string()))
    }

    /// The instant carried by a point-in-time entity.
    ///
    /// Returns `None` when the entity has no `data_EntityName` text value or the
    /// text is not a timestamp.
    #[must_use]
    pub fn from_point_in_time(point_in_time: &Thing) -> Option<Self> {
        let raw = point_in_time
            .values(&term(ENTITY_NAME))
            .into_iter()
            .flatten()
            .find_map(Value::as_text)?;
        match Self::parse(raw) {
            Ok(ts) => Some(ts),
            Err(e) => {
                tracing::warn!(point_in_time = %point_in_time.id(), error = %e, "unresolvable point in time");
                None
            }
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MIN => f.write_str("-inf"),
            Self::MAX => f.write_str("+inf"),
            ts => match ts.to_rfc3339() {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{}ns", ts.0),
            },
        }
    }
}

// =============================================================================
// INTERVAL
// =============================================================================

/// A closed validity interval `[start, finish]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// First valid instant (inclusive).
    pub start: Timestamp,
    /// Last valid instant (inclusive).
    pub finish: Timestamp,
}

impl Interval {
    /// An interval that covers all time.
    pub const ALWAYS: Self = Self {
        start: Timestamp::MIN,
        finish: Timestamp::MAX,
    };

    /// Create an interval from explicit bounds.
    #[must_use]
    pub const fn new(start: Timestamp, finish: Timestamp) -> Self {
        Self { start, finish }
    }

    /// Create an interval where a missing bound is open.
    #[must_use]
    pub fn from_bounds(start: Option<Timestamp>, finish: Option<Timestamp>) -> Self {
        Self {
            start: start.unwrap_or(Timestamp::MIN),
            finish: finish.unwrap_or(Timestamp::MAX),
        }
    }

    /// Read the interval from a row's `start`/`finish` columns.
    pub fn from_row(row: &QueryResult) -> Result<Self, ChronicleError> {
        let start = row.get(START).map(column_timestamp).transpose()?;
        let finish = row.get(FINISH).map(column_timestamp).transpose()?;
        Ok(Self::from_bounds(start, finish))
    }

    /// Check membership; both bounds are inclusive.
    #[must_use]
    pub fn contains(&self, when: Timestamp) -> bool {
        self.start <= when && when <= self.finish
    }
}

fn column_timestamp(value: &Value) -> Result<Timestamp, ChronicleError> {
    match value {
        Value::Text(s) => Timestamp::parse(s),
        Value::Iri(iri) => Timestamp::parse(iri.as_str()),
        other => Err(ChronicleError::InvalidTimestamp(other.lexical())),
    }
}

// =============================================================================
// FILTER
// =============================================================================

/// Applies the interval-membership policy to raw query rows.
pub struct TemporalFilter;

impl TemporalFilter {
    /// Keep the rows whose `[start, finish]` interval contains `when`.
    ///
    /// The variable list is preserved. Rows without interval columns are kept.
    pub fn filter_by_instant(
        when: Timestamp,
        rows: QueryResultList,
    ) -> Result<QueryResultList, ChronicleError> {
        let (var_names, results) = rows.into_parts();
        let mut kept = Vec::with_capacity(results.len());
        for row in results {
            if Interval::from_row(&row)?.contains(when) {
                kept.push(row);
            }
        }
        Ok(QueryResultList::new(var_names, kept))
    }
}

// =============================================================================
// TESTS
// =============================================================================
