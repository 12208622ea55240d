//! Polars helpers shared by the extraction and transform stages.
//!
//! Registry tables are loaded as all-string frames; these helpers convert
//! between [`CsvTable`], row maps and `DataFrame` without losing column order.

use std::collections::BTreeMap;

use polars::prelude::{AnyValue, Column, DataFrame, NamedFrom, PolarsResult, Series};

use crate::csv_table::CsvTable;

/// Converts a Polars AnyValue to a String representation.
/// Returns empty string for Null, formats floats without trailing zeros.
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Formats a number without trailing zeros (`12.0` becomes `12`).
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Parse a trimmed decimal value; empty and non-finite inputs yield None.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// String value of a column at `idx`; missing columns read as empty.
pub fn column_value(df: &DataFrame, name: &str, idx: usize) -> String {
    match df.column(name) {
        Ok(series) => any_to_string(series.get(idx).unwrap_or(AnyValue::Null)),
        Err(_) => String::new(),
    }
}

/// All values of a column as trimmed strings.
pub fn string_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    let series = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let value = any_to_string(series.get(idx).unwrap_or(AnyValue::Null));
        values.push(value.trim().to_string());
    }
    Ok(values)
}

/// Build an all-string frame from a table, preserving header order.
pub fn table_to_frame(table: &CsvTable) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let values: Vec<String> = table.rows.iter().map(|row| row[idx].clone()).collect();
            Series::new(header.as_str().into(), values).into()
        })
        .collect();
    DataFrame::new(columns)
}

/// Build an all-string frame from row maps; absent cells become empty strings.
pub fn records_to_frame(
    columns: &[String],
    records: &[BTreeMap<String, String>],
) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = columns
        .iter()
        .map(|name| {
            let values: Vec<String> = records
                .iter()
                .map(|record| record.get(name).cloned().unwrap_or_default())
                .collect();
            Series::new(name.as_str().into(), values).into()
        })
        .collect();
    DataFrame::new(columns)
}

/// Every row of a frame as a column-keyed map.
pub fn frame_records(df: &DataFrame) -> PolarsResult<Vec<BTreeMap<String, String>>> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        columns.push(string_column(df, name)?);
    }
    let records = (0..df.height())
        .map(|idx| {
            names
                .iter()
                .zip(columns.iter())
                .map(|(name, values)| (name.clone(), values[idx].clone()))
                .collect()
        })
        .collect();
    Ok(records)
}

/// Column names of a frame in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}
