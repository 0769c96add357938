//! SQLite storage backend
//!
//! Embeds the risk graph in a single database file with one table for
//! nodes and one for edges. Merge semantics come from UNIQUE constraints:
//! a node is identified by (label, properties_json) and an edge by
//! (source_id, relationship, target_id). Property lookups go through
//! SQLite's JSON functions with bound parameters.

use super::traits::{GraphStats, GraphStore, OpenStore, StorageError, StorageResult};
use crate::graph::{ImportRow, NodeKey, NodeLabel, Relationship};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed risk graph store
///
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const LIST_APPLICATIONS: &str = r#"
    SELECT DISTINCT json_extract(properties_json, '$.Application') AS application
    FROM nodes
    WHERE label = 'Context'
    ORDER BY application
"#;

const LIST_RISKS: &str = r#"
    SELECT DISTINCT json_extract(r.properties_json, '$.Name') AS risk
    FROM nodes c
    JOIN edges a ON a.target_id = c.id AND a.relationship = 'AFFECTS'
    JOIN nodes r ON r.id = a.source_id AND r.label = 'Risk'
    WHERE c.label = 'Context'
      AND json_extract(c.properties_json, '$.Application') = ?1
    ORDER BY risk
"#;

const LIST_TREATMENTS: &str = r#"
    SELECT DISTINCT json_extract(t.properties_json, '$.Name') AS treatment
    FROM nodes t
    JOIN edges m ON m.source_id = t.id AND m.relationship = 'MODIFIES'
    JOIN nodes r ON r.id = m.target_id AND r.label = 'Risk'
    JOIN edges rt ON rt.source_id = t.id AND rt.relationship = 'RELATES_TO'
    JOIN nodes c ON c.id = rt.target_id AND c.label = 'Context'
    WHERE t.label = 'Treatment'
      AND json_extract(r.properties_json, '$.Name') = ?1
      AND json_extract(c.properties_json, '$.Application') = ?2
    ORDER BY treatment
"#;

const TREATMENT_PHASE: &str = r#"
    SELECT json_extract(t.properties_json, '$.LC_Phase')
    FROM nodes t
    JOIN edges m ON m.source_id = t.id AND m.relationship = 'MODIFIES'
    JOIN nodes r ON r.id = m.target_id AND r.label = 'Risk'
    WHERE t.label = 'Treatment'
      AND json_extract(r.properties_json, '$.Name') = ?1
      AND json_extract(t.properties_json, '$.Name') = ?2
    ORDER BY t.id
    LIMIT 1
"#;

const STAKEHOLDER: &str = r#"
    SELECT json_extract(s.properties_json, '$.Name')
    FROM nodes s
    JOIN edges rf ON rf.source_id = s.id AND rf.relationship = 'RESPONSIBLE_FOR'
    JOIN nodes t ON t.id = rf.target_id AND t.label = 'Treatment'
    WHERE s.label = 'Stakeholder'
      AND json_extract(t.properties_json, '$.Name') = ?1
    ORDER BY s.id
    LIMIT 1
"#;

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- One row per merged node; all properties are key properties
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY,
                label TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                UNIQUE (label, properties_json)
            );

            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES nodes(id),
                target_id INTEGER NOT NULL REFERENCES nodes(id),
                relationship TEXT NOT NULL,
                UNIQUE (source_id, relationship, target_id)
            );

            -- Inverse traversal (AFFECTS into a context, RESPONSIBLE_FOR into a treatment)
            CREATE INDEX IF NOT EXISTS idx_edges_target
                ON edges(target_id, relationship);
            CREATE INDEX IF NOT EXISTS idx_nodes_label
                ON nodes(label);

            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Upsert a node, returning its row id
    fn merge_node(tx: &Transaction<'_>, key: &NodeKey) -> StorageResult<i64> {
        let properties_json = serde_json::to_string(&key.properties)?;
        tx.execute(
            r#"
            INSERT INTO nodes (label, properties_json) VALUES (?1, ?2)
            ON CONFLICT (label, properties_json) DO NOTHING
            "#,
            params![key.label.as_str(), properties_json],
        )?;
        let id = tx.query_row(
            "SELECT id FROM nodes WHERE label = ?1 AND properties_json = ?2",
            params![key.label.as_str(), properties_json],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn merge_edge(
        tx: &Transaction<'_>,
        source_id: i64,
        relationship: Relationship,
        target_id: i64,
    ) -> StorageResult<()> {
        tx.execute(
            r#"
            INSERT INTO edges (source_id, target_id, relationship) VALUES (?1, ?2, ?3)
            ON CONFLICT (source_id, relationship, target_id) DO NOTHING
            "#,
            params![source_id, target_id, relationship.as_str()],
        )?;
        Ok(())
    }

    fn merge_row_sync(&self, row: &ImportRow) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let plan = row.merge_plan();
        let mut ids = [0i64; 4];
        for (slot, key) in ids.iter_mut().zip(plan.nodes.iter()) {
            *slot = Self::merge_node(&tx, key)?;
        }
        for (source, relationship, target) in plan.edges {
            Self::merge_edge(&tx, ids[source], relationship, ids[target])?;
        }

        // Dropping an uncommitted transaction rolls it back
        tx.commit()?;
        Ok(())
    }

    fn query_strings<P: rusqlite::Params>(&self, sql: &str, params: P) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn query_first<P: rusqlite::Params>(&self, sql: &str, params: P) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(sql, params, |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn stats_sync(&self) -> StorageResult<GraphStats> {
        let conn = self.conn()?;
        let mut stats = GraphStats::default();
        for label in NodeLabel::ALL {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM nodes WHERE label = ?1",
                params![label.as_str()],
                |row| row.get(0),
            )?;
            stats.nodes.insert(label, count as usize);
        }
        for relationship in Relationship::ALL {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM edges WHERE relationship = ?1",
                params![relationship.as_str()],
                |row| row.get(0),
            )?;
            stats.edges.insert(relationship, count as usize);
        }
        Ok(stats)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl GraphStore for SqliteStore {
    async fn merge_row(&self, row: &ImportRow) -> StorageResult<()> {
        self.merge_row_sync(row)
    }

    async fn list_applications(&self) -> StorageResult<Vec<String>> {
        self.query_strings(LIST_APPLICATIONS, [])
    }

    async fn list_risks(&self, application: &str) -> StorageResult<Vec<String>> {
        self.query_strings(LIST_RISKS, params![application])
    }

    async fn list_treatments(&self, risk: &str, application: &str) -> StorageResult<Vec<String>> {
        self.query_strings(LIST_TREATMENTS, params![risk, application])
    }

    async fn treatment_phase(&self, risk: &str, treatment: &str) -> StorageResult<Option<String>> {
        self.query_first(TREATMENT_PHASE, params![risk, treatment])
    }

    async fn stakeholder(&self, treatment: &str) -> StorageResult<Option<String>> {
        self.query_first(STAKEHOLDER, params![treatment])
    }

    async fn stats(&self) -> StorageResult<GraphStats> {
        self.stats_sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn row(values: [&str; 8]) -> ImportRow {
        let [application, purpose, sector, risk_name, risk_phase, ctms_name, ctms_phase, stakeholder] =
            values.map(String::from);
        ImportRow {
            application,
            purpose,
            sector,
            risk_name,
            risk_phase,
            ctms_name,
            ctms_phase,
            stakeholder,
        }
    }

    fn chatbot_row() -> ImportRow {
        row([
            "ChatBot",
            "support",
            "retail",
            "Hallucination",
            "Deployment",
            "Reranking",
            "Deployment",
            "DevTeam",
        ])
    }

    // ========================================================================
    // Merge semantics
    // ========================================================================

    #[tokio::test]
    async fn single_row_creates_one_node_and_edge_of_each_kind() {
        let store = create_test_store();
        store.merge_row(&chatbot_row()).await.unwrap();

        let stats = store.stats().await.unwrap();
        for label in NodeLabel::ALL {
            assert_eq!(stats.node_count(label), 1, "{label}");
        }
        for relationship in Relationship::ALL {
            assert_eq!(stats.edge_count(relationship), 1, "{relationship}");
        }
    }

    #[tokio::test]
    async fn merging_same_row_twice_is_idempotent() {
        let store = create_test_store();
        store.merge_row(&chatbot_row()).await.unwrap();
        let before = store.stats().await.unwrap();

        store.merge_row(&chatbot_row()).await.unwrap();
        let after = store.stats().await.unwrap();

        assert_eq!(before, after);
        assert_eq!(after.total_nodes(), 4);
        assert_eq!(after.total_edges(), 4);
    }

    #[tokio::test]
    async fn shared_nodes_are_reused_across_rows() {
        let store = create_test_store();
        store.merge_row(&chatbot_row()).await.unwrap();
        store
            .merge_row(&row([
                "ChatBot",
                "support",
                "retail",
                "Hallucination",
                "Deployment",
                "Grounding",
                "Development",
                "DevTeam",
            ]))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.node_count(NodeLabel::Context), 1);
        assert_eq!(stats.node_count(NodeLabel::Risk), 1);
        assert_eq!(stats.node_count(NodeLabel::Treatment), 2);
        assert_eq!(stats.node_count(NodeLabel::Stakeholder), 1);
        assert_eq!(stats.edge_count(Relationship::Affects), 1);
        assert_eq!(stats.edge_count(Relationship::ResponsibleFor), 2);
    }

    #[tokio::test]
    async fn values_with_quotes_are_stored_verbatim() {
        let store = create_test_store();
        store
            .merge_row(&row([
                "O'Brien's Bot",
                "support",
                "retail",
                "Prompt \"injection\"",
                "Deployment",
                "Input filter'); DROP TABLE nodes; --",
                "Deployment",
                "Sec'Ops",
            ]))
            .await
            .unwrap();

        assert_eq!(store.list_applications().await.unwrap(), vec!["O'Brien's Bot"]);
        assert_eq!(
            store.list_risks("O'Brien's Bot").await.unwrap(),
            vec!["Prompt \"injection\""]
        );
        assert_eq!(
            store.stakeholder("Input filter'); DROP TABLE nodes; --").await.unwrap(),
            Some("Sec'Ops".to_string())
        );
    }

    #[tokio::test]
    async fn failed_row_rolls_back_partial_writes() {
        let store = create_test_store();
        store.merge_row(&chatbot_row()).await.unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute_batch(
                r#"
                CREATE TRIGGER reject_stakeholder_edge BEFORE INSERT ON edges
                WHEN NEW.relationship = 'RESPONSIBLE_FOR'
                BEGIN SELECT RAISE(ABORT, 'rejected'); END;
                "#,
            )
            .unwrap();

        let result = store
            .merge_row(&row(["Triage", "screening", "health", "Bias", "Design", "Audit", "Design", "Ethics"]))
            .await;
        assert!(matches!(result, Err(StorageError::Database(_))));

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_nodes(), 4, "no orphan nodes from the failed row");
        assert_eq!(stats.total_edges(), 4);
        assert_eq!(store.list_applications().await.unwrap(), vec!["ChatBot"]);
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    #[tokio::test]
    async fn lookups_on_empty_store_return_empty_results() {
        let store = create_test_store();
        assert!(store.list_applications().await.unwrap().is_empty());
        assert!(store.list_risks("ChatBot").await.unwrap().is_empty());
        assert!(store.list_treatments("Hallucination", "ChatBot").await.unwrap().is_empty());
        assert_eq!(store.treatment_phase("Hallucination", "Reranking").await.unwrap(), None);
        assert_eq!(store.stakeholder("Reranking").await.unwrap(), None);
    }

    #[tokio::test]
    async fn listings_are_distinct_and_lexicographic() {
        let store = create_test_store();
        for (app, purpose, risk) in [
            ("Zeta", "a", "Privacy"),
            ("Alpha", "a", "Toxicity"),
            ("Alpha", "b", "Bias"),
            ("Alpha", "b", "Toxicity"),
        ] {
            store
                .merge_row(&row([app, purpose, "retail", risk, "Deployment", "Review", "Deployment", "Ops"]))
                .await
                .unwrap();
        }

        assert_eq!(store.list_applications().await.unwrap(), vec!["Alpha", "Zeta"]);
        assert_eq!(store.list_risks("Alpha").await.unwrap(), vec!["Bias", "Toxicity"]);
        assert_eq!(store.list_risks("Zeta").await.unwrap(), vec!["Privacy"]);
    }

    #[tokio::test]
    async fn treatments_require_both_risk_and_context_edges() {
        let store = create_test_store();
        // Reranking modifies Hallucination for ChatBot only
        store.merge_row(&chatbot_row()).await.unwrap();
        // Watermarking modifies the same risk but relates only to Search
        store
            .merge_row(&row([
                "Search",
                "lookup",
                "media",
                "Hallucination",
                "Deployment",
                "Watermarking",
                "Deployment",
                "Legal",
            ]))
            .await
            .unwrap();
        // Logging relates to ChatBot but modifies a different risk
        store
            .merge_row(&row([
                "ChatBot", "support", "retail", "Leakage", "Operation", "Logging", "Operation", "Ops",
            ]))
            .await
            .unwrap();

        assert_eq!(
            store.list_treatments("Hallucination", "ChatBot").await.unwrap(),
            vec!["Reranking"]
        );
        assert_eq!(
            store.list_treatments("Hallucination", "Search").await.unwrap(),
            vec!["Watermarking"]
        );
        assert_eq!(store.list_treatments("Leakage", "ChatBot").await.unwrap(), vec!["Logging"]);
        assert!(store.list_treatments("Leakage", "Search").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn treatment_phase_requires_modifies_edge() {
        let store = create_test_store();
        store.merge_row(&chatbot_row()).await.unwrap();

        assert_eq!(
            store.treatment_phase("Hallucination", "Reranking").await.unwrap(),
            Some("Deployment".to_string())
        );
        assert_eq!(store.treatment_phase("Bias", "Reranking").await.unwrap(), None);
    }

    #[tokio::test]
    async fn earliest_imported_treatment_phase_wins() {
        let store = create_test_store();
        store.merge_row(&chatbot_row()).await.unwrap();
        store
            .merge_row(&row([
                "ChatBot",
                "support",
                "retail",
                "Hallucination",
                "Deployment",
                "Reranking",
                "Operation",
                "DevTeam",
            ]))
            .await
            .unwrap();

        assert_eq!(store.list_treatments("Hallucination", "ChatBot").await.unwrap(), vec!["Reranking"]);
        assert_eq!(
            store.treatment_phase("Hallucination", "Reranking").await.unwrap(),
            Some("Deployment".to_string())
        );
    }

    #[test]
    fn reopening_file_preserves_graph() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("risk.db");

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = SqliteStore::open(&db_path).unwrap();
            store.merge_row(&chatbot_row()).await.unwrap();
        });
        rt.block_on(async {
            let store = SqliteStore::open(&db_path).unwrap();
            assert_eq!(store.list_applications().await.unwrap(), vec!["ChatBot"]);
            assert_eq!(store.stakeholder("Reranking").await.unwrap(), Some("DevTeam".to_string()));
        });
    }
}
