//! # Configuration
//!
//! Settings come from three layers, highest first:
//!
//! 1. command-line flags (`--database`, `--backend`)
//! 2. a TOML file (`--config <path>`, or `chronicle.toml` in the working
//!    directory when present)
//! 3. built-in defaults
//!
//! ```toml
//! [storage]
//! database = "chronicle.db"
//! backend = "redb"
//!
//! [logging]
//! format = "json"
//! filter = "chronicle=debug"
//! ```

use chronicle_core::ChronicleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "chronicle.toml";

/// Environment variable that switches log output to JSON.
pub const LOG_FORMAT_ENV: &str = "CHRONICLE_LOG_FORMAT";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SETTINGS
// =============================================================================

/// Where the graph lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database (ACID, updated in place).
    #[default]
    Redb,
    /// Canonical dump file, loaded into memory and rewritten after writes.
    File,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redb => f.write_str("redb"),
            Self::File => f.write_str("file"),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[storage]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub backend: Backend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("chronicle.db"),
            backend: Backend::default(),
        }
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `tracing-subscriber` filter directive. `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "chronicle=info".to_string(),
        }
    }
}

/// The merged configuration for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronicleConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// LOADING
// =============================================================================

impl ChronicleConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ChronicleError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            ChronicleError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ChronicleError::Serialization(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config text.
    pub fn from_toml(content: &str) -> Result<Self, ChronicleError> {
        toml::from_str(content)
            .map_err(|e| ChronicleError::Serialization(format!("Invalid config: {e}")))
    }

    /// Load the file layer: an explicit path must exist, the default file is
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ChronicleError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply command-line flags on top.
    #[must_use]
    pub fn with_overrides(mut self, database: Option<PathBuf>, backend: Option<Backend>) -> Self {
        if let Some(database) = database {
            self.storage.database = database;
        }
        if let Some(backend) = backend {
            self.storage.backend = backend;
        }
        self
    }

    /// Apply `CHRONICLE_LOG_FORMAT`; only `json` changes anything.
    #[must_use]
    pub fn with_log_format_env(mut self, value: Option<&str>) -> Self {
        if value.is_some_and(|v| v.eq_ignore_ascii_case("json")) {
            self.logging.format = LogFormat::Json;
        }
        self
    }
}
