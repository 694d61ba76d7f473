//! # Formats Module
//!
//! Bulk dump and load of a store's contents.
//!
//! - [`DumpFormat::NTriples`]: line-oriented text, one triple per line
//! - [`DumpFormat::Canonical`]: sorted, bit-exact postcard stream with a
//!   checksummed header; the reference form for verification

pub mod canonical;
pub mod ntriples;

use crate::change::{CreateOperation, Triple};
use crate::primitives::MAX_IMPORT_BYTES;
use crate::{ChronicleError, Thing};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Serialization format for `dump`/`load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFormat {
    /// N-Triples text.
    #[default]
    NTriples,
    /// Canonical postcard binary.
    Canonical,
}

impl DumpFormat {
    /// Guess the format from a file extension (`.nt`, `.chrx`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "nt" => Some(Self::NTriples),
            "chrx" | "bin" => Some(Self::Canonical),
            _ => None,
        }
    }
}

impl FromStr for DumpFormat {
    type Err = ChronicleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nt" | "ntriples" | "n-triples" => Ok(Self::NTriples),
            "canonical" | "chrx" => Ok(Self::Canonical),
            other => Err(ChronicleError::Unsupported(format!("dump format {other:?}"))),
        }
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NTriples => f.write_str("ntriples"),
            Self::Canonical => f.write_str("canonical"),
        }
    }
}

/// Every triple of the given Things, sorted.
#[must_use]
pub fn sorted_triples(things: &[Thing]) -> Vec<Triple> {
    let mut triples: Vec<Triple> = things
        .iter()
        .flat_map(|t| {
            t.triples()
                .map(|(p, v)| Triple::new(t.id().clone(), p.clone(), v.clone()))
        })
        .collect();
    triples.sort();
    triples
}

/// Write Things in the given format.
pub fn write_dump(
    things: &[Thing],
    out: &mut dyn Write,
    format: DumpFormat,
) -> Result<(), ChronicleError> {
    match format {
        DumpFormat::NTriples => ntriples::write_ntriples(things, out)?,
        DumpFormat::Canonical => out.write_all(&canonical::export_canonical(things)?)?,
    }
    out.flush()?;
    Ok(())
}

/// Read a dump into create operations, rejecting input over
/// [`MAX_IMPORT_BYTES`].
pub fn read_dump(
    input: &mut dyn Read,
    format: DumpFormat,
) -> Result<Vec<CreateOperation>, ChronicleError> {
    let mut data = Vec::new();
    input.take(MAX_IMPORT_BYTES + 1).read_to_end(&mut data)?;
    if data.len() as u64 > MAX_IMPORT_BYTES {
        return Err(ChronicleError::Serialization(format!(
            "Dump exceeds maximum size of {MAX_IMPORT_BYTES} bytes"
        )));
    }

    let triples = match format {
        DumpFormat::NTriples => {
            let text = std::str::from_utf8(&data)
                .map_err(|e| ChronicleError::Serialization(format!("Not UTF-8: {e}")))?;
            ntriples::parse_ntriples(text)?
        }
        DumpFormat::Canonical => canonical::import_canonical(&data)?,
    };

    Ok(triples.into_iter().map(CreateOperation::from).collect())
}
