//! Storage backends for the risk graph
//!
//! Backends implement the `GraphStore` trait. `SqliteStore` embeds the
//! graph in a local file; `Neo4jStore` (behind the `neo4j` feature) talks
//! to a Neo4j server.

mod neo4j;
mod sqlite;
mod traits;

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jStore;
pub use sqlite::SqliteStore;
pub use traits::{GraphStats, GraphStore, OpenStore, StorageError, StorageResult};

use crate::config::StoreSettings;
use std::sync::Arc;

/// Open the store selected by configuration
pub async fn open_store(settings: &StoreSettings) -> StorageResult<Arc<dyn GraphStore>> {
    match settings {
        StoreSettings::Sqlite { path } => {
            let store = SqliteStore::open(path)?;
            tracing::info!(path = %path.display(), "opened sqlite graph store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "neo4j")]
        StoreSettings::Neo4j(neo4j) => Ok(Arc::new(Neo4jStore::connect(neo4j).await?)),
        #[cfg(not(feature = "neo4j"))]
        StoreSettings::Neo4j(_) => Err(StorageError::BackendUnavailable(
            "neo4j (rebuild with --features neo4j)".to_string(),
        )),
    }
}
