//! Runtime configuration read from the environment
//!
//! The binary loads a `.env` file (if present) before reading these
//! variables, so either source works.

use std::path::PathBuf;
use thiserror::Error;

pub const NEO4J_URI: &str = "NEO4J_URI";
pub const NEO4J_USERNAME: &str = "NEO4J_USERNAME";
pub const NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";
pub const NEO4J_DATABASE: &str = "NEO4J_DATABASE";
pub const RISKGRAPH_DB: &str = "RISKGRAPH_DB";
pub const OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const OLLAMA_MODEL: &str = "OLLAMA_MODEL";

pub const DEFAULT_NEO4J_DATABASE: &str = "neo4j";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1:8b";

/// Errors in startup configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set when NEO4J_URI is set")]
    Missing(&'static str),
}

/// Neo4j connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jSettings {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// Which graph store to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    Sqlite { path: PathBuf },
    Neo4j(Neo4jSettings),
}

/// Chat model endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
}

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store: StoreSettings,
    pub model: ModelSettings,
}

/// Get the default database path (~/.local/share/riskgraph/riskgraph.db)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("riskgraph").join("riskgraph.db")
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// `db_override` (the `--db` flag) takes precedence over `RISKGRAPH_DB`
    /// but is ignored when `NEO4J_URI` selects the Neo4j backend.
    pub fn from_env(db_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), db_override)
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F, db_override: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = match var(NEO4J_URI) {
            Some(uri) => StoreSettings::Neo4j(Neo4jSettings {
                uri,
                username: var(NEO4J_USERNAME).ok_or(ConfigError::Missing(NEO4J_USERNAME))?,
                password: var(NEO4J_PASSWORD).ok_or(ConfigError::Missing(NEO4J_PASSWORD))?,
                database: var(NEO4J_DATABASE).unwrap_or_else(|| DEFAULT_NEO4J_DATABASE.to_string()),
            }),
            None => StoreSettings::Sqlite {
                path: db_override
                    .or_else(|| var(RISKGRAPH_DB).map(PathBuf::from))
                    .unwrap_or_else(default_db_path),
            },
        };

        let model = ModelSettings {
            base_url: var(OLLAMA_HOST).unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            model: var(OLLAMA_MODEL).unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        };

        Ok(Self { store, model })
    }
}
