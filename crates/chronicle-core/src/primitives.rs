//! # Primitives
//!
//! Fixed format constants and input limits, compiled into the binary.

/// Magic bytes for the canonical dump header.
pub const CANONICAL_MAGIC: [u8; 4] = *b"CHRX";

/// Current canonical dump version.
///
/// Increment this when making breaking changes to the canonical layout.
pub const CANONICAL_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of triples accepted from a canonical dump.
///
/// Checked against the header before the payload is deserialized.
pub const MAX_IMPORT_TRIPLE_COUNT: u64 = 10_000_000;

/// Maximum size of a dump read by `load`/`import` (512 MiB).
pub const MAX_IMPORT_BYTES: u64 = 512 * 1024 * 1024;

/// Maximum length of one literal in a text dump (64 KiB).
pub const MAX_LITERAL_LENGTH: usize = 65536;
