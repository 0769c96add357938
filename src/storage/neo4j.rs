//! Neo4jStore: the risk graph in a Neo4j database
//!
//! Writes each row as one Cypher MERGE statement inside an explicit
//! transaction. All values travel as bound parameters; only the fixed
//! label and relationship names appear in query text.

#[cfg(feature = "neo4j")]
mod inner {
    use crate::config::Neo4jSettings;
    use crate::graph::{ImportRow, NodeLabel, Relationship};
    use crate::storage::{GraphStats, GraphStore, StorageError, StorageResult};
    use async_trait::async_trait;
    use neo4rs::{query, ConfigBuilder, Graph, Query};

    const MERGE_ROW: &str = r#"
        MERGE (c:Context {Application: $application, Purpose: $purpose, Sector: $sector})
        MERGE (r:Risk {Name: $risk_name, LC_Phase: $risk_phase})
        MERGE (r)-[:AFFECTS]->(c)
        MERGE (t:Treatment {Name: $ctms_name, LC_Phase: $ctms_phase})
        MERGE (t)-[:MODIFIES]->(r)
        MERGE (t)-[:RELATES_TO]->(c)
        MERGE (s:Stakeholder {Name: $stakeholder})
        MERGE (s)-[:RESPONSIBLE_FOR]->(t)
    "#;

    // Lowest internal id is the earliest-created node, so the first match
    // is the earliest-imported one, as in the SQLite store.
    const TREATMENT_PHASE: &str = "MATCH (t:Treatment {Name: $treatment})-[:MODIFIES]->(:Risk {Name: $risk}) \
         RETURN t.LC_Phase AS phase ORDER BY id(t) LIMIT 1";

    const STAKEHOLDER: &str = "MATCH (s:Stakeholder)-[:RESPONSIBLE_FOR]->(:Treatment {Name: $treatment}) \
         RETURN s.Name AS stakeholder ORDER BY id(s) LIMIT 1";

    fn neo4j_err(e: impl std::fmt::Display) -> StorageError {
        StorageError::Neo4j(e.to_string())
    }

    /// Neo4j-backed risk graph store
    pub struct Neo4jStore {
        graph: Graph,
    }

    impl Neo4jStore {
        /// Connect to the configured database
        pub async fn connect(settings: &Neo4jSettings) -> StorageResult<Self> {
            let config = ConfigBuilder::default()
                .uri(settings.uri.as_str())
                .user(settings.username.as_str())
                .password(settings.password.as_str())
                .db(settings.database.as_str())
                .build()
                .map_err(neo4j_err)?;
            let graph = Graph::connect(config).await.map_err(neo4j_err)?;
            tracing::info!(uri = %settings.uri, database = %settings.database, "connected to neo4j");
            Ok(Self { graph })
        }

        async fn strings(&self, q: Query, column: &str) -> StorageResult<Vec<String>> {
            let mut result = self.graph.execute(q).await.map_err(neo4j_err)?;
            let mut values = Vec::new();
            while let Some(row) = result.next().await.map_err(neo4j_err)? {
                values.push(row.get::<String>(column).map_err(neo4j_err)?);
            }
            Ok(values)
        }

        async fn first(&self, q: Query, column: &str) -> StorageResult<Option<String>> {
            Ok(self.strings(q, column).await?.into_iter().next())
        }

        async fn count(&self, cypher: &str) -> StorageResult<usize> {
            let mut result = self.graph.execute(query(cypher)).await.map_err(neo4j_err)?;
            match result.next().await.map_err(neo4j_err)? {
                Some(row) => Ok(row.get::<i64>("count").map_err(neo4j_err)? as usize),
                None => Ok(0),
            }
        }
    }

    #[async_trait]
    impl GraphStore for Neo4jStore {
        async fn merge_row(&self, row: &ImportRow) -> StorageResult<()> {
            let q = query(MERGE_ROW)
                .param("application", row.application.as_str())
                .param("purpose", row.purpose.as_str())
                .param("sector", row.sector.as_str())
                .param("risk_name", row.risk_name.as_str())
                .param("risk_phase", row.risk_phase.as_str())
                .param("ctms_name", row.ctms_name.as_str())
                .param("ctms_phase", row.ctms_phase.as_str())
                .param("stakeholder", row.stakeholder.as_str());

            let mut txn = self.graph.start_txn().await.map_err(neo4j_err)?;
            txn.run(q).await.map_err(neo4j_err)?;
            txn.commit().await.map_err(neo4j_err)
        }

        async fn list_applications(&self) -> StorageResult<Vec<String>> {
            let q = query("MATCH (c:Context) RETURN DISTINCT c.Application AS application ORDER BY application");
            self.strings(q, "application").await
        }

        async fn list_risks(&self, application: &str) -> StorageResult<Vec<String>> {
            let q = query(
                "MATCH (c:Context {Application: $application})<-[:AFFECTS]-(r:Risk) \
                 RETURN DISTINCT r.Name AS risk ORDER BY risk",
            )
            .param("application", application);
            self.strings(q, "risk").await
        }

        async fn list_treatments(&self, risk: &str, application: &str) -> StorageResult<Vec<String>> {
            let q = query(
                "MATCH (r:Risk {Name: $risk})<-[:MODIFIES]-(t:Treatment)\
                 -[:RELATES_TO]->(:Context {Application: $application}) \
                 RETURN DISTINCT t.Name AS treatment ORDER BY treatment",
            )
            .param("risk", risk)
            .param("application", application);
            self.strings(q, "treatment").await
        }

        async fn treatment_phase(&self, risk: &str, treatment: &str) -> StorageResult<Option<String>> {
            let q = query(TREATMENT_PHASE)
            .param("risk", risk)
            .param("treatment", treatment);
            self.first(q, "phase").await
        }

        async fn stakeholder(&self, treatment: &str) -> StorageResult<Option<String>> {
            let q = query(STAKEHOLDER).param("treatment", treatment);
            self.first(q, "stakeholder").await
        }

        async fn stats(&self) -> StorageResult<GraphStats> {
            let mut stats = GraphStats::default();
            for label in NodeLabel::ALL {
                let cypher = format!("MATCH (n:{}) RETURN count(n) AS count", label.as_str());
                stats.nodes.insert(label, self.count(&cypher).await?);
            }
            for relationship in Relationship::ALL {
                let cypher = format!("MATCH ()-[e:{}]->() RETURN count(e) AS count", relationship.as_str());
                stats.edges.insert(relationship, self.count(&cypher).await?);
            }
            Ok(stats)
        }
    }

}

#[cfg(feature = "neo4j")]
pub use inner::Neo4jStore;