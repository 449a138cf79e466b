//! Configuration schema (sqlgraph.toml)
//!
//! The resolution knowledge base is assembled once, validated, and stays
//! immutable for the duration of every extraction run that borrows it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// SQL dialect configuration
///
/// Selects the tokenizer dialect; `MsSql` understands `[bracketed]`
/// identifiers and `#temp`/`@param` prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// Transact-SQL
    MsSql,

    /// PostgreSQL
    Postgres,

    /// MySQL
    MySql,

    /// Generic ANSI SQL
    Ansi,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::MsSql
    }
}

/// Tie-break policy when a bare name is known to live in more than one schema
///
/// Whatever the pick, the resulting edge is flagged ambiguous; the strategy
/// only decides which node the edge attaches to for graph connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityStrategy {
    /// Pick the first candidate in the knowledge base's insertion order
    FirstCandidate,

    /// Pick the configured default schema when it is among the candidates,
    /// else the first candidate
    PreferDefault,
}

impl Default for AmbiguityStrategy {
    fn default() -> Self {
        Self::FirstCandidate
    }
}

/// Main configuration: dialect, knowledge base, and resolution policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Known schema names; the first is the resolver's fallback default
    #[serde(default)]
    pub known_schemas: Vec<String>,

    /// Tie-break policy for multi-candidate resolutions
    #[serde(default)]
    pub ambiguity: AmbiguityStrategy,

    /// Bare object name -> ordered list of schemas known to contain it
    #[serde(default)]
    pub object_locations: HashMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            known_schemas: Vec::new(),
            ambiguity: AmbiguityStrategy::default(),
            object_locations: HashMap::new(),
        }
    }
}

impl Config {
    /// Build a config from schema names, defaulting everything else
    pub fn with_schemas(known_schemas: Vec<String>) -> Self {
        Self {
            known_schemas,
            ..Self::default()
        }
    }

    /// Register an object name as living in the given schemas
    ///
    /// Builder-style; intended for assembling the knowledge base before any
    /// extraction starts.
    pub fn with_object(mut self, name: impl Into<String>, schemas: Vec<String>) -> Self {
        self.object_locations.insert(name.into(), schemas);
        self
    }

    /// The fallback schema, if any schemas are configured
    pub fn default_schema(&self) -> Option<&str> {
        self.known_schemas.first().map(|s| s.as_str())
    }

    /// Check the config is usable for resolution
    ///
    /// A resolver with no fallback schema has no defined behavior, so this
    /// must be called (directly or via resolver construction) before any
    /// traversal begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.known_schemas.is_empty() {
            return Err(ConfigError::NoKnownSchemas);
        }

        Ok(())
    }

    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("known_schemas must not be empty: the first entry is the resolver's fallback")]
    NoKnownSchemas,
}
