//! # chronicle
//!
//! Library half of the Chronicle binary: argument parsing, configuration
//! layering and command implementations. `main.rs` only wires logging and
//! the exit code.

pub mod cli;
pub mod config;
