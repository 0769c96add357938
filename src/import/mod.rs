//! Importer: tabular risk-governance rows into the risk graph
//!
//! Each row is merged in its own store transaction. A row that fails
//! validation or storage is recorded in the [`ImportReport`] and skipped;
//! the rest of the batch continues.

mod source;

pub use source::{read_csv, read_rows, read_workbook, RawRow, SourceRow};

use crate::storage::{GraphStore, StorageError};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from reading or merging import rows
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("line {line}: missing value for column '{column}'")]
    MissingField { line: usize, column: &'static str },

    #[error("line {line}: unreadable record: {source}")]
    UnreadableRecord {
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error("unsupported file format: {0} (expected .csv, .xlsx, .xlsm, .xls or .ods)")]
    UnsupportedFormat(String),

    #[error("workbook has no worksheets: {0}")]
    EmptyWorkbook(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

impl ImportError {
    /// Source line of a row-level error
    pub fn line(&self) -> Option<usize> {
        match self {
            ImportError::MissingField { line, .. } | ImportError::UnreadableRecord { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// A row that was not merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub line: usize,
    pub reason: String,
}

/// Outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows merged successfully (re-merging an existing row counts)
    pub merged: usize,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequential, one-shot batch importer
pub struct Importer {
    store: Arc<dyn GraphStore>,
}

impl Importer {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Read a CSV or workbook file and merge every row.
    ///
    /// Only failure to open the file or read its header is an error; row
    /// failures, including undecodable records, are collected in the report.
    pub async fn import_path(&self, path: &Path) -> ImportResult<ImportReport> {
        let rows = read_rows(path)?;
        tracing::info!(path = %path.display(), rows = rows.len(), "importing rows");
        Ok(self.import_source(rows).await)
    }

    /// Merge rows one at a time, in order
    pub async fn import_rows(&self, rows: &[RawRow]) -> ImportReport {
        self.import_source(rows.iter().cloned().map(Ok)).await
    }

    async fn import_source(&self, rows: impl IntoIterator<Item = SourceRow>) -> ImportReport {
        let mut report = ImportReport::default();
        for row in rows {
            let line = match &row {
                Ok(raw) => raw.line,
                Err(e) => e.line().unwrap_or_default(),
            };
            match self.import_row(row).await {
                Ok(()) => {
                    tracing::debug!(line, "merged row");
                    report.merged += 1;
                }
                Err(e) => {
                    tracing::warn!(line, error = %e, "skipped row");
                    report.failures.push(RowFailure {
                        line,
                        reason: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            merged = report.merged,
            failed = report.failures.len(),
            "import finished"
        );
        report
    }

    async fn import_row(&self, row: SourceRow) -> ImportResult<()> {
        let row = row?.to_import_row()?;
        self.store.merge_row(&row).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeLabel, COLUMNS};
    use crate::storage::{OpenStore, SqliteStore};

    fn importer() -> (Importer, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        (Importer::new(store.clone()), store)
    }

    fn raw(line: usize, values: [&str; 8]) -> RawRow {
        RawRow::from_cells(line, &COLUMNS, values)
    }

    #[tokio::test]
    async fn bad_row_does_not_stop_the_batch() {
        let (importer, store) = importer();
        let rows = vec![
            raw(2, ["ChatBot", "support", "retail", "Hallucination", "Deployment", "Reranking", "Deployment", "DevTeam"]),
            raw(3, ["ChatBot", "support", "retail", "Bias", "Design", "Audit", "Design", ""]),
            raw(4, ["Triage", "screening", "health", "Bias", "Design", "Audit", "Design", "Ethics"]),
        ];

        let report = importer.import_rows(&rows).await;

        assert_eq!(report.merged, 2);
        assert_eq!(
            report.failures,
            vec![RowFailure {
                line: 3,
                reason: "line 3: missing value for column 'stakeholder'".to_string(),
            }]
        );
        assert!(!report.is_clean());
        assert_eq!(store.list_applications().await.unwrap(), vec!["ChatBot", "Triage"]);
        // The rejected row's Bias risk exists only through the Triage row
        assert_eq!(store.list_risks("ChatBot").await.unwrap(), vec!["Hallucination"]);
        assert_eq!(store.stats().await.unwrap().node_count(NodeLabel::Stakeholder), 2);
    }

    #[tokio::test]
    async fn reimporting_rows_changes_nothing() {
        let (importer, store) = importer();
        let rows = vec![raw(
            2,
            ["ChatBot", "support", "retail", "Hallucination", "Deployment", "Reranking", "Deployment", "DevTeam"],
        )];

        assert!(importer.import_rows(&rows).await.is_clean());
        let first = store.stats().await.unwrap();
        assert!(importer.import_rows(&rows).await.is_clean());
        assert_eq!(store.stats().await.unwrap(), first);
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let (importer, _) = importer();
        let result = importer.import_path(Path::new("/nonexistent/kg.csv")).await;
        assert!(matches!(result, Err(ImportError::Csv(_))));
    }
}
