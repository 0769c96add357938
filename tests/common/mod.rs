//! Shared fixtures for riskgraph integration tests
//!
//! Rows are written to CSV files in a temporary directory and imported
//! through the public `Importer`, the same path the CLI takes.

#![allow(dead_code)]

use riskgraph::graph::COLUMNS;
use riskgraph::{ImportReport, Importer, OpenStore, SqliteStore};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// The single-row example scenario
pub const CHATBOT_ROW: [&str; 8] = [
    "ChatBot",
    "support",
    "retail",
    "Hallucination",
    "Deployment",
    "Reranking",
    "Deployment",
    "DevTeam",
];

/// A small graph with two contexts sharing a risk
pub const PROCUREMENT_ROWS: [[&str; 8]; 5] = [
    CHATBOT_ROW,
    ["ChatBot", "support", "retail", "Hallucination", "Deployment", "External knowledge", "Deployment", "DevTeam"],
    ["ChatBot", "support", "retail", "Bias", "Design", "Bias audit", "Design", "Ethics board"],
    ["Search", "lookup", "media", "Bias", "Design", "Reweighting", "Development", "Data team"],
    ["Search", "lookup", "media", "Leakage", "Operation", "Access logging", "Operation", "Security"],
];

/// Write a CSV with the canonical header and the given rows
pub fn write_csv(dir: &TempDir, name: &str, rows: &[[&str; 8]]) -> PathBuf {
    let path = dir.path().join(name);
    let mut writer = csv::Writer::from_path(&path).expect("create csv");
    writer.write_record(COLUMNS).expect("write header");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    writer.flush().expect("flush csv");
    path
}

/// Write raw text to a file, for malformed inputs
pub fn write_text(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create file");
    file.write_all(text.as_bytes()).expect("write file");
    path
}

/// An in-memory store with `rows` imported from a CSV file
pub async fn imported_store(rows: &[[&str; 8]]) -> (Arc<SqliteStore>, ImportReport) {
    let dir = TempDir::new().expect("tempdir");
    let path = write_csv(&dir, "rows.csv", rows);
    let store = Arc::new(SqliteStore::open_in_memory().expect("open store"));
    let report = Importer::new(store.clone())
        .import_path(&path)
        .await
        .expect("import");
    (store, report)
}
