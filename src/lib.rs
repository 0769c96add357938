//! riskgraph: AI risk-governance graph and acquisition guideline generator
//!
//! Imports rows describing which risks affect which application contexts,
//! which treatments modify them and who is responsible, into a labeled
//! property graph. A four-step wizard then walks a user from a context to
//! chosen countermeasures and asks a chat model for procurement guidelines.
//!
//! # Core Concepts
//!
//! - **Nodes**: Context, Risk, Treatment and Stakeholder, merged on their key properties
//! - **Edges**: AFFECTS, MODIFIES, RELATES_TO and RESPONSIBLE_FOR
//! - **Stores**: embedded SQLite by default, Neo4j behind the `neo4j` feature
//!
//! # Example
//!
//! ```
//! use riskgraph::{GraphStore, ImportRow, OpenStore, SqliteStore};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = SqliteStore::open_in_memory().unwrap();
//! let row = ImportRow {
//!     application: "ChatBot".into(),
//!     purpose: "support".into(),
//!     sector: "retail".into(),
//!     risk_name: "Hallucination".into(),
//!     risk_phase: "Deployment".into(),
//!     ctms_name: "Reranking".into(),
//!     ctms_phase: "Deployment".into(),
//!     stakeholder: "DevTeam".into(),
//! };
//! store.merge_row(&row).await.unwrap();
//! assert_eq!(store.list_applications().await.unwrap(), vec!["ChatBot"]);
//! # });
//! ```

pub mod config;
pub mod graph;
pub mod guidance;
pub mod import;
pub mod llm;
pub mod storage;
pub mod wizard;

pub use config::{ConfigError, Settings};
pub use graph::{ImportRow, NodeKey, NodeLabel, Relationship};
pub use guidance::{GuidanceGenerator, GuidanceRecord};
pub use import::{ImportError, ImportReport, Importer, RowFailure};
pub use llm::{GuidanceModel, LlmError, MockClient, OllamaClient};
pub use storage::{open_store, GraphStats, GraphStore, OpenStore, SqliteStore, StorageError, StorageResult};
pub use wizard::{Step, WizardError, WizardSession, WizardState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
