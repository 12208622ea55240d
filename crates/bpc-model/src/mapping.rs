use serde::{Deserialize, Serialize};

/// One row of the field-mapping metadata for a cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    /// Registry variable name, unique within a cohort.
    pub variable: String,
    /// Output category name (e.g. `TIMELINE-TREATMENT`), empty when unassigned.
    #[serde(default)]
    pub category: String,
    /// Dataset the variable is read from.
    #[serde(default)]
    pub dataset: String,
    /// Column name in the source table.
    pub source_field: String,
    /// Target column name; empty means the variable is not exported.
    #[serde(default)]
    pub target_field: String,
    /// Raw `"code, label | code, label"` choice string.
    #[serde(default)]
    pub choices: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub priority: String,
}

impl MappingRow {
    pub fn new(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self {
            source_field: variable.clone(),
            variable,
            category: String::new(),
            dataset: String::new(),
            target_field: String::new(),
            choices: String::new(),
            label: String::new(),
            description: String::new(),
            data_type: String::new(),
            priority: String::new(),
        }
    }

    #[must_use]
    pub fn with_choices(mut self, choices: impl Into<String>) -> Self {
        self.choices = choices.into();
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_field = target.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_field = source.into();
        self
    }

    pub fn is_exported(&self) -> bool {
        !self.target_field.trim().is_empty()
    }
}

/// Header metadata for one clinical attribute column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalAttribute {
    pub column: String,
    pub label: String,
    pub description: String,
    pub data_type: String,
    pub priority: String,
}

impl ClinicalAttribute {
    /// Fallback metadata for a column with no recorded attribute.
    pub fn fallback(column: &str) -> Self {
        Self {
            column: column.to_string(),
            label: column.to_string(),
            description: column.to_string(),
            data_type: "STRING".to_string(),
            priority: "1".to_string(),
        }
    }
}
