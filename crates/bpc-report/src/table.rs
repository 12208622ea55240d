//! Tab-delimited rendering of output tables.
//!
//! Clinical tables are preceded by four `#` metadata lines: display names,
//! descriptions, data types and priorities, one entry per column.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use bpc_core::TargetTable;
use bpc_model::{CategoryKind, ClinicalAttribute};

use crate::common::{sanitize_cell, write_atomic};

/// Render a table as the text of its output file.
pub fn render_table(table: &TargetTable) -> Result<String> {
    let columns = table.columns();
    let mut out = String::new();
    if table.category.kind() == CategoryKind::Clinical {
        let header = match &table.header {
            Some(header) => header.clone(),
            None => columns
                .iter()
                .map(|column| ClinicalAttribute::fallback(column))
                .collect(),
        };
        out.push_str(&header_lines(&header));
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());
    writer
        .write_record(columns.iter().map(|column| sanitize_cell(column)))
        .context("write column header")?;
    for record in table.records()? {
        writer
            .write_record(
                columns
                    .iter()
                    .map(|column| sanitize_cell(record.get(column).map_or("", String::as_str))),
            )
            .with_context(|| format!("write {} row", table.category))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| anyhow::anyhow!("flush {} rows: {error}", table.category))?;
    out.push_str(&String::from_utf8(bytes).context("output is not valid UTF-8")?);
    Ok(out)
}

fn header_lines(header: &[ClinicalAttribute]) -> String {
    let mut lines: [Vec<String>; 4] = Default::default();
    for attribute in header {
        lines[0].push(sanitize_cell(&attribute.label));
        lines[1].push(sanitize_cell(&attribute.description));
        lines[2].push(sanitize_cell(&attribute.data_type));
        lines[3].push(sanitize_cell(&attribute.priority));
    }
    lines
        .iter()
        .map(|cells| format!("#{}\n", cells.join("\t")))
        .collect()
}

/// Write a table to `{dir}/{CATEGORY}.txt`, replacing any previous file atomically.
pub fn write_table(dir: &Path, table: &TargetTable) -> Result<PathBuf> {
    let path = dir.join(table.file_name());
    let contents = render_table(table)?;
    write_atomic(&path, contents.as_bytes())?;
    Ok(path)
}
