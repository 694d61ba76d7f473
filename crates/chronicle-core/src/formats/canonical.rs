//! # Canonical Dump
//!
//! A sorted, bit-exact postcard stream of every triple in a store.
//!
//! redb files are not byte-identical across runs, so verification and hashing
//! always go through this form:
//!
//! ```text
//! [header_len: u32 LE] [CanonicalHeader (postcard)] [CanonicalDump (postcard)]
//! ```

use super::sorted_triples;
use crate::change::Triple;
use crate::primitives::{CANONICAL_MAGIC, CANONICAL_VERSION, MAX_IMPORT_TRIPLE_COUNT};
use crate::{ChronicleError, Thing, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEADER
// =============================================================================

/// Header for canonical dump files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    /// Magic bytes to identify the format.
    pub magic: [u8; 4],

    /// Format version for compatibility.
    pub version: u8,

    /// Number of triples in the payload.
    pub triple_count: u64,

    /// Checksum of the payload.
    pub checksum: u64,
}

impl CanonicalHeader {
    /// Create a header for the current version.
    #[must_use]
    pub fn new(triple_count: u64, checksum: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            triple_count,
            checksum,
        }
    }

    /// Validate magic, version and size limits.
    ///
    /// Messages are kept generic so a corrupt file reveals little about the
    /// layout.
    pub fn validate(&self) -> Result<(), ChronicleError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(ChronicleError::Serialization(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != CANONICAL_VERSION {
            return Err(ChronicleError::Serialization(
                "Unsupported file version".to_string(),
            ));
        }
        if self.triple_count > MAX_IMPORT_TRIPLE_COUNT {
            return Err(ChronicleError::Serialization(format!(
                "Triple count {} exceeds maximum allowed {}",
                self.triple_count, MAX_IMPORT_TRIPLE_COUNT
            )));
        }
        Ok(())
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// The sorted triples of a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalDump {
    /// Triples in ascending order.
    pub triples: Vec<Triple>,
}

impl CanonicalDump {
    /// Build the canonical form of a set of Things.
    #[must_use]
    pub fn from_things(things: &[Thing]) -> Self {
        Self {
            triples: sorted_triples(things),
        }
    }

    /// Deterministic, order-sensitive checksum of the payload.
    ///
    /// Detects accidental corruption only; it is not collision resistant. Use
    /// [`canonical_crypto_hash`] where tampering matters.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for triple in &self.triples {
            hash = mix(hash, triple.subject().as_str().as_bytes());
            hash = mix(hash, triple.predicate().as_str().as_bytes());
            let tag: &[u8] = match triple.object() {
                Value::Iri(_) => b"i",
                Value::Text(_) => b"t",
                Value::Integer(_) => b"n",
                Value::Boolean(_) => b"b",
            };
            hash = mix(hash, tag);
            hash = mix(hash, triple.object().lexical().as_bytes());
        }
        hash
    }
}

fn mix(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    // Field separator so ("ab","c") and ("a","bc") differ.
    hash.rotate_left(17) ^ 0xff
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Serialize Things to the canonical form.
pub fn export_canonical(things: &[Thing]) -> Result<Vec<u8>, ChronicleError> {
    let dump = CanonicalDump::from_things(things);
    let header = CanonicalHeader::new(dump.triples.len() as u64, dump.checksum());

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| ChronicleError::Serialization(format!("Header: {e}")))?;
    let data_bytes = postcard::to_allocvec(&dump)
        .map_err(|e| ChronicleError::Serialization(format!("Data: {e}")))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);
    Ok(result)
}

/// Parse and verify a canonical dump.
pub fn import_canonical(data: &[u8]) -> Result<Vec<Triple>, ChronicleError> {
    let Some((len_bytes, rest)) = data.split_first_chunk::<4>() else {
        return Err(ChronicleError::Serialization("Data too short".to_string()));
    };
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(ChronicleError::Serialization(
            "Data too short for header".to_string(),
        ));
    }
    let (header_bytes, payload) = rest.split_at(header_len);

    let header: CanonicalHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| ChronicleError::Serialization(format!("Header: {e}")))?;
    header.validate()?;

    let dump: CanonicalDump = postcard::from_bytes(payload)
        .map_err(|e| ChronicleError::Serialization(format!("Data: {e}")))?;

    if dump.triples.len() as u64 != header.triple_count {
        return Err(ChronicleError::Serialization(
            "Triple count mismatch".to_string(),
        ));
    }
    let computed = dump.checksum();
    if computed != header.checksum {
        return Err(ChronicleError::Serialization(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if !dump.triples.is_sorted() {
        return Err(ChronicleError::Serialization(
            "Triples are not in canonical order".to_string(),
        ));
    }

    Ok(dump.triples)
}

/// Check that a canonical dump holds exactly the triples of `things`.
pub fn verify_canonical(things: &[Thing], data: &[u8]) -> Result<bool, ChronicleError> {
    Ok(import_canonical(data)? == sorted_triples(things))
}

/// Checksum of the canonical form of `things`.
#[must_use]
pub fn canonical_checksum(things: &[Thing]) -> u64 {
    CanonicalDump::from_things(things).checksum()
}

/// BLAKE3 hash of the canonical dump, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash(things: &[Thing]) -> Result<String, ChronicleError> {
    let data = export_canonical(things)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

/// Compare `things` against a BLAKE3 hash of their canonical dump.
#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(things: &[Thing], expected: &str) -> Result<bool, ChronicleError> {
    Ok(canonical_crypto_hash(things)?.eq_ignore_ascii_case(expected))
}

// =============================================================================
// TESTS
// =============================================================================
