//! # Chronicle - Time-Indexed Knowledge Graph CLI
//!
//! The main binary for chronicle-core.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/chronicle (THE BINARY)        │
//! │                                               │
//! │  ┌─────────────┐        ┌─────────────────┐   │
//! │  │   CLI       │        │  Config layers  │   │
//! │  │  (clap)     │        │  (toml + flags) │   │
//! │  └──────┬──────┘        └────────┬────────┘   │
//! │         └────────────┬───────────┘            │
//! │                      ▼                        │
//! │             ┌─────────────────┐               │
//! │             │ chronicle-core  │               │
//! │             │  (THE LOGIC)    │               │
//! │             └─────────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! chronicle init
//! chronicle apply -f transformation.json
//! chronicle resolve --community <iri> --pattern <iri> "Smith" --at 2020-06-01T00:00:00Z
//! chronicle export -o graph.nt
//! ```

use chronicle::cli;
use chronicle::config::{ChronicleConfig, LOG_FORMAT_ENV, LogFormat, LoggingConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();
    let log_format_env = std::env::var(LOG_FORMAT_ENV).ok();

    let config = ChronicleConfig::load(cli.config.as_deref()).map(|c| {
        c.with_overrides(cli.database.clone(), cli.backend)
            .with_log_format_env(log_format_env.as_deref())
    });

    let logging = match &config {
        Ok(c) => c.logging.clone(),
        Err(_) => ChronicleConfig::default()
            .with_log_format_env(log_format_env.as_deref())
            .logging,
    };
    init_tracing(&logging, cli.verbose, cli.quiet);

    let result = config.and_then(|config| cli::execute(cli, &config));
    if let Err(e) = result {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`/`--quiet`,
/// which win over the configured filter.
fn init_tracing(logging: &LoggingConfig, verbose: bool, quiet: bool) {
    let fallback = if verbose {
        "chronicle=debug".to_string()
    } else if quiet {
        "chronicle=warn".to_string()
    } else {
        logging.filter.clone()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
