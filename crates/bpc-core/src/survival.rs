//! Clinical attribute metadata shared by every clinical output of a run.
//!
//! The summary is computed once, from the treatment timeline extraction, and
//! then handed by reference to every clinical category. It combines the
//! header metadata recorded on the mapping rows with the PRISSMM summary
//! table, which takes precedence where both describe a column.

use std::collections::BTreeMap;

use bpc_ingest::CsvTable;
use bpc_model::{AssetId, Category, ClinicalAttribute, MappingRow};
use tracing::debug;

use crate::extract::ExtractBundle;

const ATTRIBUTE_COLUMN: &[&str] = &["attribute", "cbio", "column", "target_field"];
const LABEL_COLUMN: &[&str] = &["label", "labels"];
const DESCRIPTION_COLUMN: &[&str] = &["description", "descriptions"];
const DATA_TYPE_COLUMN: &[&str] = &["data_type", "colType", "datatype"];
const PRIORITY_COLUMN: &[&str] = &["priority"];

const CLINICAL_CATEGORIES: [Category; 4] = [
    Category::Survival,
    Category::Regimen,
    Category::Sample,
    Category::Patient,
];

/// Attributes every clinical file may carry regardless of the mapping.
const BUILTIN_ATTRIBUTES: &[(&str, &str, &str, &str)] = &[
    ("PATIENT_ID", "Patient Identifier", "Identifier to uniquely specify a patient.", "STRING"),
    ("SAMPLE_ID", "Sample Identifier", "A unique sample identifier.", "STRING"),
    ("SEQ_ASSAY_ID", "Sequence Assay ID", "Identifier of the sequencing assay panel.", "STRING"),
    ("ONCOTREE_CODE", "Oncotree Code", "Oncotree code of the sample.", "STRING"),
    ("CANCER_TYPE", "Cancer Type", "Cancer type derived from the oncotree code.", "STRING"),
    (
        "CANCER_TYPE_DETAILED",
        "Cancer Type Detailed",
        "Detailed cancer type derived from the oncotree code.",
        "STRING",
    ),
    ("REGIMEN_DRUGS", "Regimen Drugs", "Drugs given in the regimen.", "STRING"),
];

/// Column name to clinical attribute metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurvivalSummary {
    attributes: BTreeMap<String, ClinicalAttribute>,
    sources: Vec<AssetId>,
}

impl SurvivalSummary {
    /// Build the summary from the treatment timeline extraction.
    pub fn compute(bundle: &ExtractBundle) -> Self {
        let mut attributes = BTreeMap::new();
        for (column, label, description, data_type) in BUILTIN_ATTRIBUTES {
            attributes.insert(
                (*column).to_string(),
                ClinicalAttribute {
                    column: (*column).to_string(),
                    label: (*label).to_string(),
                    description: (*description).to_string(),
                    data_type: (*data_type).to_string(),
                    priority: "1".to_string(),
                },
            );
        }
        for category in CLINICAL_CATEGORIES {
            for row in bundle.catalog.rows_for_category(category) {
                attributes
                    .entry(row.target_field.trim().to_string())
                    .or_insert_with(|| attribute_from_mapping(row));
            }
        }
        if let Some(prissmm) = &bundle.prissmm {
            for attribute in attributes_from_table(prissmm) {
                attributes.insert(attribute.column.clone(), attribute);
            }
        }
        debug!(attributes = attributes.len(), "computed survival summary");
        Self {
            attributes,
            sources: bundle.metadata_assets.clone(),
        }
    }

    pub fn from_attributes<I>(attributes: I) -> Self
    where
        I: IntoIterator<Item = ClinicalAttribute>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|attribute| (attribute.column.clone(), attribute))
                .collect(),
            sources: Vec::new(),
        }
    }

    /// Assets the metadata was read from; every clinical file that carries
    /// this header lists them as used.
    pub fn sources(&self) -> &[AssetId] {
        &self.sources
    }

    pub fn get(&self, column: &str) -> Option<&ClinicalAttribute> {
        self.attributes.get(column)
    }

    /// Header metadata for the given columns, falling back to the column name.
    pub fn header_for<S: AsRef<str>>(&self, columns: &[S]) -> Vec<ClinicalAttribute> {
        columns
            .iter()
            .map(|column| {
                let column = column.as_ref();
                self.get(column)
                    .cloned()
                    .unwrap_or_else(|| ClinicalAttribute::fallback(column))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn attribute_from_mapping(row: &MappingRow) -> ClinicalAttribute {
    let column = row.target_field.trim();
    let label = non_empty_or(&row.label, column);
    ClinicalAttribute {
        column: column.to_string(),
        description: non_empty_or(&row.description, &label),
        label,
        data_type: non_empty_or(&row.data_type, "STRING").to_ascii_uppercase(),
        priority: non_empty_or(&row.priority, "1"),
    }
}

fn attributes_from_table(table: &CsvTable) -> Vec<ClinicalAttribute> {
    let Some(attribute_idx) = table.column_index(ATTRIBUTE_COLUMN) else {
        return Vec::new();
    };
    let label_idx = table.column_index(LABEL_COLUMN);
    let description_idx = table.column_index(DESCRIPTION_COLUMN);
    let data_type_idx = table.column_index(DATA_TYPE_COLUMN);
    let priority_idx = table.column_index(PRIORITY_COLUMN);
    table
        .rows
        .iter()
        .filter_map(|row| {
            let column = row[attribute_idx].trim();
            if column.is_empty() {
                return None;
            }
            let label = non_empty_or(CsvTable::cell(row, label_idx), column);
            Some(ClinicalAttribute {
                column: column.to_string(),
                description: non_empty_or(CsvTable::cell(row, description_idx), &label),
                label,
                data_type: non_empty_or(CsvTable::cell(row, data_type_idx), "STRING")
                    .to_ascii_uppercase(),
                priority: non_empty_or(CsvTable::cell(row, priority_idx), "1"),
            })
        })
        .collect()
}
