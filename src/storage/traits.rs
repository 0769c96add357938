//! Storage trait definitions

use crate::graph::{ImportRow, NodeLabel, Relationship};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Neo4j error: {0}")]
    Neo4j(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Backend not available in this build: {0}")]
    BackendUnavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Node and edge counts per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: BTreeMap<NodeLabel, usize>,
    pub edges: BTreeMap<Relationship, usize>,
}

impl GraphStats {
    pub fn node_count(&self, label: NodeLabel) -> usize {
        self.nodes.get(&label).copied().unwrap_or(0)
    }

    pub fn edge_count(&self, relationship: Relationship) -> usize {
        self.edges.get(&relationship).copied().unwrap_or(0)
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.values().sum()
    }

    pub fn total_edges(&self) -> usize {
        self.edges.values().sum()
    }
}

/// Trait for risk graph storage backends
///
/// Writes happen only through [`GraphStore::merge_row`]; everything else is
/// a pure read. Lookups that find nothing return an empty result rather
/// than an error.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // === Writes ===

    /// Merge one row: upsert its four nodes and four edges in a single
    /// transaction. A failure leaves the graph exactly as it was.
    async fn merge_row(&self, row: &ImportRow) -> StorageResult<()>;

    // === Lookups ===

    /// Distinct Context applications, lexicographically ordered
    async fn list_applications(&self) -> StorageResult<Vec<String>>;

    /// Distinct risk names that AFFECT a context of the given application,
    /// lexicographically ordered
    async fn list_risks(&self, application: &str) -> StorageResult<Vec<String>>;

    /// Distinct treatment names that both MODIFY the named risk and
    /// RELATE_TO a context of the given application
    async fn list_treatments(&self, risk: &str, application: &str) -> StorageResult<Vec<String>>;

    /// Lifecycle phase of the named treatment where it MODIFIES the named risk
    async fn treatment_phase(&self, risk: &str, treatment: &str) -> StorageResult<Option<String>>;

    /// Stakeholder RESPONSIBLE_FOR the named treatment
    async fn stakeholder(&self, treatment: &str) -> StorageResult<Option<String>>;

    /// Node and edge counts per kind
    async fn stats(&self) -> StorageResult<GraphStats>;
}

/// Extension trait for opening file-backed stores
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
