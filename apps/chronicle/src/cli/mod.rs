//! # Chronicle CLI Module
//!
//! This module implements the CLI interface for Chronicle.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new database
//! - `status` - Show store status
//! - `get` - Print one Thing
//! - `apply` - Apply a JSON transformation
//! - `resolve` - Find the Things a sign denotes at a point in time
//! - `signs` - List the signs of a Thing at a point in time
//! - `import` - Load a dump into the store
//! - `export` - Write the store as a dump
//! - `verify` - Check the model against the HQDM catalogue and a canonical dump
//! - `hash` - Compute BLAKE3 cryptographic hash of the store

mod commands;

use crate::config::{Backend, ChronicleConfig};
use chronicle_core::{ChronicleError, DumpFormat, Iri};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Chronicle - time-indexed knowledge graph
///
/// Entities change only through atomic change-sets; signs resolve to
/// entities through the validity intervals of their representations.
#[derive(Parser, Debug)]
#[command(name = "chronicle")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the graph database [default: chronicle.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend [default: redb]
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Config file [default: ./chronicle.toml if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show store status
    Status,

    /// Print the Thing with this identifier
    Get {
        /// Thing IRI
        id: Iri,
    },

    /// Apply a transformation read from a JSON file
    Apply {
        /// Path to the transformation file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Find the Things represented by a sign
    Resolve {
        /// Recognizing community IRI
        #[arg(long)]
        community: Iri,

        /// Pattern IRI
        #[arg(long)]
        pattern: Iri,

        /// Sign text
        value: String,

        /// Match signs containing the text, ignoring case
        #[arg(long)]
        partial: bool,

        /// Point in time (RFC 3339) [default: now]
        #[arg(long)]
        at: Option<String>,
    },

    /// List the signs that represent a Thing
    Signs {
        /// Thing IRI
        entity: Iri,

        /// Point in time (RFC 3339) [default: now]
        #[arg(long)]
        at: Option<String>,
    },

    /// Load a dump into the store
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Dump format (ntriples, canonical) [default: from extension]
        #[arg(short = 't', long)]
        format: Option<DumpFormat>,
    },

    /// Write the store as a dump
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Dump format (ntriples, canonical) [default: from extension]
        #[arg(short = 't', long)]
        format: Option<DumpFormat>,
    },

    /// Check stored Things against the HQDM catalogue
    Verify {
        /// Also compare the store with this canonical dump
        #[arg(long)]
        against: Option<PathBuf>,
    },

    /// Compute BLAKE3 cryptographic hash of the store
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and merged configuration.
pub fn execute(cli: Cli, config: &ChronicleConfig) -> Result<(), ChronicleError> {
    let ctx = Context {
        config,
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Status) | None => cmd_status(&ctx),
        Some(Commands::Get { id }) => cmd_get(&ctx, &id),
        Some(Commands::Apply { file }) => cmd_apply(&ctx, &file),
        Some(Commands::Resolve {
            community,
            pattern,
            value,
            partial,
            at,
        }) => cmd_resolve(&ctx, &community, &pattern, &value, partial, at.as_deref()),
        Some(Commands::Signs { entity, at }) => cmd_signs(&ctx, &entity, at.as_deref()),
        Some(Commands::Import { input, format }) => cmd_import(&ctx, &input, format),
        Some(Commands::Export { output, format }) => cmd_export(&ctx, &output, format),
        Some(Commands::Verify { against }) => cmd_verify(&ctx, against.as_deref()),
        Some(Commands::Hash) => cmd_hash(&ctx),
    }
}
