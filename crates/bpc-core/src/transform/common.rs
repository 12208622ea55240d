//! Shared steps of every category transform: field mapping, retraction
//! exclusion, day re-basing and drug agent derivation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::debug;

use bpc_ingest::{column_names, format_numeric, frame_records, parse_f64};
use bpc_map::MappingCatalog;
use bpc_model::{Category, MappingRow, PATIENT_KEY, SAMPLE_KEY};

use crate::extract::ExtractBundle;
use crate::frame::TargetTable;

pub(crate) type Record = BTreeMap<String, String>;

/// Converts a mapped value given its mapping row.
pub(crate) type ValueHook = fn(&MappingRow, &str) -> String;

/// One source row that survived retraction, with its mapped target values.
#[derive(Debug, Clone)]
pub(crate) struct SourceRow {
    pub patient_id: String,
    pub sample_id: String,
    pub raw: Record,
    pub mapped: Record,
}

/// Mapped rows plus the target columns in mapping order.
#[derive(Debug, Default)]
pub(crate) struct MappedRows {
    pub targets: Vec<String>,
    pub rows: Vec<SourceRow>,
}

/// Map every dataset row of the bundle to target fields.
///
/// Source fields without a mapping row are dropped. Rows whose patient or
/// sample identifier is retracted, and rows without a patient identifier,
/// are skipped. Coded values are replaced by their choice labels.
pub(crate) fn map_rows(bundle: &ExtractBundle, hook: Option<ValueHook>) -> Result<MappedRows> {
    let category = bundle.category;
    let mapping = bundle.catalog.rows_for_category(category);
    let mut mapped = MappedRows::default();
    for row in &mapping {
        push_unique(&mut mapped.targets, row.target_field.trim());
    }

    let mut excluded = 0usize;
    for frame in &bundle.datasets {
        let columns = column_names(&frame.data);
        let rows: Vec<&MappingRow> = mapping
            .iter()
            .copied()
            .filter(|row| applies_to_dataset(row, &frame.dataset))
            .filter(|row| columns.iter().any(|c| c == &row.source_field))
            .collect();
        let records = frame_records(&frame.data)
            .with_context(|| format!("read dataset {} for {category}", frame.dataset))?;
        for raw in records {
            let patient_id = raw.get(PATIENT_KEY).map_or("", |v| v.trim()).to_string();
            if patient_id.is_empty() {
                continue;
            }
            let sample_id = raw.get(SAMPLE_KEY).map_or("", |v| v.trim()).to_string();
            if bundle
                .excluded
                .excludes_any([patient_id.as_str(), sample_id.as_str()])
            {
                excluded += 1;
                continue;
            }
            let values = map_values(&bundle.catalog, &rows, &raw, hook);
            mapped.rows.push(SourceRow {
                patient_id,
                sample_id,
                raw,
                mapped: values,
            });
        }
    }
    debug!(
        category = %category,
        rows = mapped.rows.len(),
        excluded,
        "mapped source rows"
    );
    Ok(mapped)
}

fn applies_to_dataset(row: &MappingRow, dataset: &str) -> bool {
    let wanted = row.dataset.trim();
    wanted.is_empty() || wanted.eq_ignore_ascii_case(dataset)
}

fn map_values(
    catalog: &MappingCatalog,
    rows: &[&MappingRow],
    raw: &Record,
    hook: Option<ValueHook>,
) -> Record {
    let mut values = Record::new();
    for row in rows {
        let target = row.target_field.trim();
        let value = raw.get(&row.source_field).map_or("", |v| v.trim());
        let value = if value.is_empty() {
            String::new()
        } else {
            catalog
                .choice_label(&row.variable, value)
                .unwrap_or_else(|| value.to_string())
        };
        let value = match hook {
            Some(convert) => convert(row, &value),
            None => value,
        };
        let slot = values.entry(target.to_string()).or_default();
        if slot.is_empty() {
            *slot = value;
        }
    }
    values
}

pub(crate) fn push_unique(columns: &mut Vec<String>, column: &str) {
    if !column.is_empty() && !columns.iter().any(|c| c == column) {
        columns.push(column.to_string());
    }
}

/// Re-base a day value on the patient's index day.
///
/// With anchors configured, a patient without an index day, or a value that
/// is not numeric, yields an empty (undefined) offset.
pub(crate) fn rebase_day(
    value: &str,
    patient_id: &str,
    anchors: Option<&BTreeMap<String, f64>>,
) -> String {
    let Some(day) = parse_f64(value) else {
        return String::new();
    };
    match anchors {
        Some(anchors) => anchors
            .get(patient_id)
            .map(|anchor| format_numeric(day - anchor))
            .unwrap_or_default(),
        None => format_numeric(day),
    }
}

/// Output rows with a stable column order.
///
/// Columns are the fixed leading columns, then every other column in order
/// of first appearance.
#[derive(Debug)]
pub(crate) struct OutputRows {
    columns: Vec<String>,
    records: Vec<Record>,
    merge_index: BTreeMap<String, usize>,
}

impl OutputRows {
    pub fn new(leading: &[&str]) -> Self {
        Self {
            columns: leading.iter().map(|c| (*c).to_string()).collect(),
            records: Vec::new(),
            merge_index: BTreeMap::new(),
        }
    }

    pub fn add_columns<S: AsRef<str>>(&mut self, columns: &[S]) {
        for column in columns {
            push_unique(&mut self.columns, column.as_ref());
        }
    }

    pub fn push(&mut self, record: Record) {
        for column in record.keys() {
            push_unique(&mut self.columns, column);
        }
        self.records.push(record);
    }

    /// Merge a record into the row with the same key; the first non-empty value wins.
    pub fn push_merged(&mut self, key: &str, record: Record) {
        match self.merge_index.get(key) {
            Some(&idx) => {
                for column in record.keys() {
                    push_unique(&mut self.columns, column);
                }
                let existing = &mut self.records[idx];
                for (column, value) in record {
                    let slot = existing.entry(column).or_default();
                    if slot.is_empty() {
                        *slot = value;
                    }
                }
            }
            None => {
                self.merge_index.insert(key.to_string(), self.records.len());
                self.push(record);
            }
        }
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Record) -> bool,
    {
        self.records.retain(keep);
        self.merge_index.clear();
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn into_table(self, category: Category) -> Result<TargetTable> {
        TargetTable::from_records(category, &self.columns, &self.records)
    }
}

/// Drug labels of the five drug slots, in slot order without repeats.
///
/// The free-text field of a slot replaces its coded value when filled; coded
/// values are translated to their choice labels.
pub(crate) fn drug_labels(raw: &Record, catalog: &MappingCatalog) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for slot in MappingCatalog::drug_variable_names().chunks(2) {
        let [primary, other] = slot else {
            continue;
        };
        let coded = raw.get(*primary).map_or("", |v| v.trim());
        let free_text = raw.get(*other).map_or("", |v| v.trim());
        let label = if !free_text.is_empty() {
            free_text.to_string()
        } else if !coded.is_empty() {
            catalog
                .choice_label(primary, coded)
                .unwrap_or_else(|| coded.to_string())
        } else {
            continue;
        };
        push_unique(&mut labels, &label);
    }
    labels
}

/// True when any drug slot column is present in a raw row.
pub(crate) fn has_drug_columns(raw: &Record) -> bool {
    MappingCatalog::drug_variable_names()
        .iter()
        .any(|name| raw.contains_key(*name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebase_day_subtracts_anchor() {
        let mut anchors = BTreeMap::new();
        anchors.insert("P-1".to_string(), 100.0);
        assert_eq!(rebase_day("130", "P-1", Some(&anchors)), "30");
        assert_eq!(rebase_day("90.5", "P-1", Some(&anchors)), "-9.5");
        assert_eq!(rebase_day("130", "P-2", Some(&anchors)), "");
        assert_eq!(rebase_day("unknown", "P-1", Some(&anchors)), "");
        assert_eq!(rebase_day("42.0", "P-2", None), "42");
    }

    #[test]
    fn merged_rows_keep_first_non_empty_value() {
        let mut rows = OutputRows::new(&["PATIENT_ID"]);
        let first: Record = [("PATIENT_ID", "P-1"), ("SEX", ""), ("RACE", "White")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let second: Record = [("PATIENT_ID", "P-1"), ("SEX", "Female"), ("RACE", "Asian")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        rows.push_merged("P-1", first);
        rows.push_merged("P-1", second);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.records()[0]["SEX"], "Female");
        assert_eq!(rows.records()[0]["RACE"], "White");
    }

    #[test]
    fn drug_labels_prefer_free_text_and_translate_codes() {
        let catalog = MappingCatalog::from_rows(vec![
            MappingRow::new("drugs_drug_1").with_choices("45, Carboplatin | 99, Other"),
            MappingRow::new("drugs_drug_2").with_choices("45, Carboplatin | 99, Other"),
        ]);
        let raw: Record = [
            ("drugs_drug_1", "45"),
            ("drugs_drug_2", "99"),
            ("drugs_drug_oth2", "Investigational agent"),
            ("drugs_drug_3", "Carboplatin"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(
            drug_labels(&raw, &catalog),
            vec!["Carboplatin", "Investigational agent"]
        );
        assert!(has_drug_columns(&raw));
    }
}
