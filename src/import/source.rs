//! Tabular row sources: CSV files and spreadsheet workbooks

use super::{ImportError, ImportResult};
use crate::graph::{ImportRow, COLUMNS};
use calamine::{open_workbook_auto, Reader};
use std::collections::HashMap;
use std::path::Path;

/// One data row as read from the source, before validation.
///
/// Cells are keyed by lower-cased, trimmed header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based spreadsheet line (the header is line 1)
    pub line: usize,
    pub cells: HashMap<String, String>,
}

impl RawRow {
    /// Pair header names with cell values
    pub fn from_cells<H, C>(line: usize, headers: &[H], cells: impl IntoIterator<Item = C>) -> Self
    where
        H: AsRef<str>,
        C: Into<String>,
    {
        let cells = headers
            .iter()
            .map(|h| normalize_header(h.as_ref()))
            .zip(cells.into_iter().map(Into::into))
            .collect();
        Self { line, cells }
    }

    /// Validate into an [`ImportRow`]. Absent or blank cells are rejected.
    pub fn to_import_row(&self) -> ImportResult<ImportRow> {
        let field = |column: &'static str| -> ImportResult<String> {
            self.cells
                .get(column)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ImportError::MissingField {
                    line: self.line,
                    column,
                })
        };
        Ok(ImportRow {
            application: field(COLUMNS[0])?,
            purpose: field(COLUMNS[1])?,
            sector: field(COLUMNS[2])?,
            risk_name: field(COLUMNS[3])?,
            risk_phase: field(COLUMNS[4])?,
            ctms_name: field(COLUMNS[5])?,
            ctms_phase: field(COLUMNS[6])?,
            stakeholder: field(COLUMNS[7])?,
        })
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// One source row: decoded cells, or the reason that line could not be read
pub type SourceRow = ImportResult<RawRow>;

/// Read every data row of a CSV file or the first sheet of a workbook,
/// choosing the reader by file extension.
///
/// The outer error means the file itself could not be opened or its
/// header read. A record that fails to decode is returned in place as an
/// [`ImportError::UnreadableRecord`] so its siblings still import.
pub fn read_rows(path: &Path) -> ImportResult<Vec<SourceRow>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xls" | "ods" => Ok(read_workbook(path)?.into_iter().map(Ok).collect()),
        _ => Err(ImportError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Read rows from CSV. The first record is the header.
pub fn read_csv(path: &Path) -> ImportResult<Vec<SourceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        match record {
            Ok(record) => rows.push(Ok(RawRow::from_cells(line, &headers, record.iter()))),
            // The reader cannot resume after an I/O failure
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(source) => rows.push(Err(ImportError::UnreadableRecord { line, source })),
        }
    }
    Ok(rows)
}

/// Read rows from the first worksheet. The first row is the header.
pub fn read_workbook(path: &Path) -> ImportResult<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::EmptyWorkbook(path.display().to_string()))??;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    Ok(sheet_rows
        .enumerate()
        .map(|(index, cells)| {
            RawRow::from_cells(index + 2, &headers, cells.iter().map(|cell| cell.to_string()))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_rows_are_keyed_by_header_and_numbered_from_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "kg.csv",
            "Application , purpose,sector,risk_name,risk_phase,ctms_name,ctms_phase,stakeholder\n\
             ChatBot, support ,retail,Hallucination,Deployment,Reranking,Deployment,DevTeam\n",
        );

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        let raw = rows[0].as_ref().unwrap();
        assert_eq!(raw.line, 2);
        let row = raw.to_import_row().unwrap();
        assert_eq!(row.application, "ChatBot");
        assert_eq!(row.purpose, "support");
        assert_eq!(row.stakeholder, "DevTeam");
    }

    #[test]
    fn extra_columns_are_ignored_and_order_does_not_matter() {
        let raw = RawRow::from_cells(
            7,
            &["stakeholder", "notes", "ctms_phase", "ctms_name", "risk_phase", "risk_name", "sector", "purpose", "application"],
            ["Ops", "ignored", "Operation", "Logging", "Operation", "Leakage", "retail", "support", "ChatBot"],
        );
        let row = raw.to_import_row().unwrap();
        assert_eq!(row.ctms_name, "Logging");
        assert_eq!(row.stakeholder, "Ops");
    }

    #[test]
    fn blank_or_absent_cells_are_missing_fields() {
        let headers = COLUMNS;
        let raw = RawRow::from_cells(3, &headers, ["ChatBot", "support", "retail", "Bias", "  ", "Audit", "Design", "Ethics"]);
        assert!(matches!(
            raw.to_import_row(),
            Err(ImportError::MissingField { line: 3, column: "risk_phase" })
        ));

        let short = RawRow::from_cells(4, &headers, ["ChatBot", "support"]);
        assert!(matches!(
            short.to_import_row(),
            Err(ImportError::MissingField { line: 4, column: "sector" })
        ));
    }

    #[test]
    fn undecodable_record_is_reported_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.csv");
        let mut bytes = b"application,purpose\nChatBot,support\n".to_vec();
        bytes.extend_from_slice(b"Bad\xff,support\nSearch,lookup\n");
        std::fs::write(&path, bytes).unwrap();

        let rows = read_csv(&path).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_ref().unwrap().line, 2);
        assert!(matches!(rows[1], Err(ImportError::UnreadableRecord { line: 3, .. })));
        assert_eq!(rows[2].as_ref().unwrap().cells["application"], "Search");
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    #[test]
    fn workbook_rows_are_keyed_by_header_and_numbered_from_two() {
        let rows: Vec<RawRow> = read_rows(&fixture("kg-journal.xlsx"))
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(rows.iter().map(|r| r.line).collect::<Vec<_>>(), vec![2, 3, 4]);
        // Mixed-case, padded headers; numeric cells render without a fraction
        let first = rows[0].to_import_row().unwrap();
        assert_eq!(first.application, "ChatBot");
        assert_eq!(first.purpose, "42");
        assert_eq!(first.ctms_name, "Reranking");
        assert_eq!(first.stakeholder, "DevTeam");

        assert!(matches!(
            rows[1].to_import_row(),
            Err(ImportError::MissingField { line: 3, column: "stakeholder" })
        ));
        assert_eq!(rows[2].to_import_row().unwrap().application, "Search");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "kg.txt", "application\nChatBot\n");
        assert!(matches!(read_rows(&path), Err(ImportError::UnsupportedFormat(_))));
    }
}
