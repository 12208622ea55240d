use std::collections::BTreeMap;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::AssetError;

/// A delimited table with normalized headers and string cells.
///
/// Rows are padded or truncated to the header width on load, so
/// `rows[i].len() == headers.len()` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Read a delimited file. Blank lines are skipped.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<CsvTable, AssetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, &e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, &e))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, &e))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(normalize_cell).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    Ok(CsvTable { headers, rows })
}

fn csv_error(path: &Path, error: &csv::Error) -> AssetError {
    if let csv::ErrorKind::Io(io) = error.kind() {
        if io.kind() == std::io::ErrorKind::NotFound {
            return AssetError::io(path, std::io::Error::new(io.kind(), io.to_string()));
        }
    }
    AssetError::Csv {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_records(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            headers.iter().map(|h| (*h).to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first header matching any alias, compared case-insensitively.
    pub fn column_index(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            self.headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(alias))
        })
    }

    pub fn column_values(&self, aliases: &[&str]) -> Option<Vec<&str>> {
        let idx = self.column_index(aliases)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    pub fn cell(row: &[String], idx: Option<usize>) -> &str {
        idx.and_then(|i| row.get(i)).map_or("", String::as_str)
    }

    /// Rows as header-keyed maps.
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row.as_slice()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_normalization_collapses_whitespace_and_bom() {
        assert_eq!(normalize_header("\u{feff} record   id "), "record id");
        assert_eq!(normalize_cell("  x\u{feff}"), "x");
    }

    #[test]
    fn new_pads_short_rows() {
        let table = CsvTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
        );
        assert_eq!(table.rows[0], vec!["1".to_string(), String::new()]);
    }

    #[test]
    fn column_index_honors_alias_order() {
        let table = CsvTable::from_records(&["cbio", "Target_Field"], &[]);
        assert_eq!(table.column_index(&["target_field", "cbio"]), Some(1));
        assert_eq!(table.column_index(&["missing"]), None);
    }
}
