//! Field-mapping metadata for one cohort.
//!
//! The catalog is loaded either from the pre-validated reference set or from
//! the generic data dictionary. Both sources are normalized to
//! [`MappingRow`]s through the header aliases below, so callers never see
//! which one was used.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use bpc_ingest::{AssetStore, CsvTable};
use bpc_model::{AssetId, Category, CohortConfig, MappingRow};

use crate::choices::parse_choices;
use crate::error::MappingError;

const VARIABLE_COLUMN: &[&str] = &["variable", "code", "Variable / Field Name", "field_name"];
const CATEGORY_COLUMN: &[&str] = &["category", "sampleType", "sample_type"];
const DATASET_COLUMN: &[&str] = &["dataset", "Form Name", "form_name"];
const SOURCE_COLUMN: &[&str] = &["source_field", "source"];
const TARGET_COLUMN: &[&str] = &["target_field", "cbio"];
const CHOICES_COLUMN: &[&str] = &[
    "choices",
    "Choices, Calculations, OR Slider Labels",
    "select_choices_or_calculations",
];
const LABEL_COLUMN: &[&str] = &["label", "labels", "Field Label", "field_label"];
const DESCRIPTION_COLUMN: &[&str] = &["description", "descriptions"];
const DATA_TYPE_COLUMN: &[&str] = &["data_type", "colType", "datatype"];
const PRIORITY_COLUMN: &[&str] = &["priority"];

const DRUG_VARIABLE_NAMES: [&str; 10] = [
    "drugs_drug_1",
    "drugs_drug_oth1",
    "drugs_drug_2",
    "drugs_drug_oth2",
    "drugs_drug_3",
    "drugs_drug_oth3",
    "drugs_drug_4",
    "drugs_drug_oth4",
    "drugs_drug_5",
    "drugs_drug_oth5",
];

/// Mapping metadata keyed by variable name.
#[derive(Debug, Clone)]
pub struct MappingCatalog {
    source: Option<AssetId>,
    rows: Vec<MappingRow>,
    index: BTreeMap<String, usize>,
}

impl MappingCatalog {
    /// Load the catalog for a cohort.
    ///
    /// `use_reference_set` selects the reference set asset; otherwise the data
    /// dictionary is read. A fetch failure is returned to the caller.
    pub fn load(
        store: &dyn AssetStore,
        cohort: &CohortConfig,
        use_reference_set: bool,
    ) -> Result<Self, MappingError> {
        let asset = cohort.assets.mapping(use_reference_set);
        let table = store.read_table(asset)?;
        let catalog = Self::from_table(&table, asset, &cohort.id)?;
        debug!(
            cohort = %cohort.id,
            asset = %asset,
            reference_set = use_reference_set,
            variables = catalog.len(),
            "loaded mapping catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog from a mapping table.
    ///
    /// When the table has a column named after the cohort, only rows whose
    /// cell is truthy are kept. Duplicate variables keep their first row.
    pub fn from_table(
        table: &CsvTable,
        asset: &AssetId,
        cohort_id: &str,
    ) -> Result<Self, MappingError> {
        let variable_idx =
            table
                .column_index(VARIABLE_COLUMN)
                .ok_or_else(|| MappingError::MissingColumn {
                    asset: asset.clone(),
                    column: "variable".to_string(),
                })?;
        let category_idx = table.column_index(CATEGORY_COLUMN);
        let dataset_idx = table.column_index(DATASET_COLUMN);
        let source_idx = table.column_index(SOURCE_COLUMN);
        let target_idx = table.column_index(TARGET_COLUMN);
        let choices_idx = table.column_index(CHOICES_COLUMN);
        let label_idx = table.column_index(LABEL_COLUMN);
        let description_idx = table.column_index(DESCRIPTION_COLUMN);
        let data_type_idx = table.column_index(DATA_TYPE_COLUMN);
        let priority_idx = table.column_index(PRIORITY_COLUMN);
        let cohort_idx = table.column_index(&[cohort_id]);

        let mut rows = Vec::with_capacity(table.len());
        for raw in &table.rows {
            let variable = raw[variable_idx].trim();
            if variable.is_empty() {
                continue;
            }
            if let Some(idx) = cohort_idx
                && !is_truthy(&raw[idx])
            {
                continue;
            }
            let cell = |idx: Option<usize>| CsvTable::cell(raw, idx).to_string();
            let source = cell(source_idx);
            rows.push(MappingRow {
                variable: variable.to_string(),
                category: cell(category_idx),
                dataset: cell(dataset_idx),
                source_field: if source.is_empty() {
                    variable.to_string()
                } else {
                    source
                },
                target_field: cell(target_idx),
                choices: cell(choices_idx),
                label: cell(label_idx),
                description: cell(description_idx),
                data_type: cell(data_type_idx),
                priority: cell(priority_idx),
            });
        }
        let mut catalog = Self::from_rows(rows);
        catalog.source = Some(asset.clone());
        Ok(catalog)
    }

    pub fn from_rows(rows: Vec<MappingRow>) -> Self {
        let mut kept: Vec<MappingRow> = Vec::with_capacity(rows.len());
        let mut index = BTreeMap::new();
        for row in rows {
            if index.contains_key(&row.variable) {
                warn!(variable = %row.variable, "duplicate mapping variable ignored");
                continue;
            }
            index.insert(row.variable.clone(), kept.len());
            kept.push(row);
        }
        Self {
            source: None,
            rows: kept,
            index,
        }
    }

    /// The fixed drug slot variables: five slots, each a coded field then its free-text field.
    pub fn drug_variable_names() -> &'static [&'static str] {
        &DRUG_VARIABLE_NAMES
    }

    /// Asset the catalog was read from.
    pub fn source(&self) -> Option<&AssetId> {
        self.source.as_ref()
    }

    pub fn rows(&self) -> &[MappingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, variable: &str) -> Option<&MappingRow> {
        self.index.get(variable).map(|&idx| &self.rows[idx])
    }

    /// Variable name to raw choice string, for every row with choices.
    pub fn choice_strings(&self) -> BTreeMap<String, String> {
        self.rows
            .iter()
            .filter(|row| !row.choices.trim().is_empty())
            .map(|row| (row.variable.clone(), row.choices.clone()))
            .collect()
    }

    /// Exported rows assigned to a category, in catalog order.
    pub fn rows_for_category(&self, category: Category) -> Vec<&MappingRow> {
        self.rows
            .iter()
            .filter(|row| {
                row.is_exported() && row.category.trim().eq_ignore_ascii_case(category.name())
            })
            .collect()
    }

    /// Distinct datasets referenced by a category, in first-use order.
    pub fn datasets_for_category(&self, category: Category) -> Vec<String> {
        let mut datasets: Vec<String> = Vec::new();
        for row in self.rows_for_category(category) {
            let dataset = row.dataset.trim();
            if !dataset.is_empty() && !datasets.iter().any(|d| d == dataset) {
                datasets.push(dataset.to_string());
            }
        }
        datasets
    }

    /// Translate a raw coded value to its choice label.
    ///
    /// Returns None when the variable has no choices or the value is not one of its codes.
    pub fn choice_label(&self, variable: &str, value: &str) -> Option<String> {
        let row = self.get(variable)?;
        let value = value.trim();
        parse_choices(&row.choices)
            .into_iter()
            .find(|entry| entry.code == value)
            .map(|entry| entry.label)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "x"
    )
}
