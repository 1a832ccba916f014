//! # Configuration
//!
//! Optional TOML file with three sections, every key defaulted:
//!
//! ```toml
//! [storage]
//! database = "concord.db"
//! backend = "redb"        # or "file"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [writer]
//! max_attempts = 3
//! ```
//!
//! Command-line flags override file values. Security settings stay in the
//! environment (`CONCORD_API_KEY`, `CONCORD_RATE_LIMIT`, `CONCORD_CORS_ORIGINS`).

use concord_core::ConcordError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum accepted size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// STORAGE
// =============================================================================

/// Where the graph lives between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database, every batch committed in one transaction.
    #[default]
    Redb,
    /// In-memory graph saved as a snapshot file after each mutation.
    File,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redb => f.write_str("redb"),
            Self::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub backend: Backend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("concord.db"),
            backend: Backend::Redb,
        }
    }
}

// =============================================================================
// SERVER / WRITER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterConfig {
    /// Attempts per write when the store reports a retryable failure.
    pub max_attempts: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub writer: WriterConfig,
}

impl Config {
    /// Parse a configuration document.
    pub fn from_toml(text: &str) -> Result<Self, ConcordError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ConcordError::Serialization(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConcordError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let metadata = std::fs::metadata(path).map_err(|e| {
            ConcordError::Serialization(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConcordError::Serialization(format!(
                "Config file exceeds {} bytes",
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConcordError::Serialization(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Apply command-line overrides on top of file values.
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

    fn validate(&self) -> Result<(), ConcordError> {
        if self.writer.max_attempts == 0 {
            return Err(ConcordError::Validation(
                "writer.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.server.host.is_empty() {
            return Err(ConcordError::Validation(
                "server.host must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [storage]
            backend = "file"

            [writer]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, Backend::File);
        assert_eq!(config.storage.database, PathBuf::from("concord.db"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.writer.max_attempts, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[storage]\nflavour = \"x\"\n").is_err());
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let err = Config::from_toml("[writer]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConcordError::Validation(_)));
    }

    #[test]
    fn overrides_win_over_file() {
        let config = Config::from_toml("[storage]\ndatabase = \"a.db\"\n")
            .unwrap()
            .with_overrides(Some(PathBuf::from("b.db")), Some(Backend::File));
        assert_eq!(config.storage.database, PathBuf::from("b.db"));
        assert_eq!(config.storage.backend, Backend::File);
    }

    #[test]
    fn missing_path_means_defaults() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("concord.toml");
        std::fs::write(&path, "[server]\nport = 9090\n").expect("write config");
        assert_eq!(Config::load(Some(&path)).unwrap().server.addr(), "127.0.0.1:9090");
    }
}
