//! Output tables produced by category transforms.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;

use bpc_ingest::{column_names, frame_records, records_to_frame, string_column};
use bpc_model::{Category, ClinicalAttribute};

/// Rows of one output category.
///
/// Clinical tables carry their attribute header once the survival summary has
/// been attached; timeline tables never do.
#[derive(Debug, Clone)]
pub struct TargetTable {
    pub category: Category,
    pub data: DataFrame,
    pub header: Option<Vec<ClinicalAttribute>>,
}

impl TargetTable {
    pub fn new(category: Category, data: DataFrame) -> Self {
        Self {
            category,
            data,
            header: None,
        }
    }

    pub fn from_records(
        category: Category,
        columns: &[String],
        records: &[BTreeMap<String, String>],
    ) -> Result<Self> {
        let data = records_to_frame(columns, records)
            .with_context(|| format!("build {category} output frame"))?;
        Ok(Self::new(category, data))
    }

    pub fn record_count(&self) -> usize {
        self.data.height()
    }

    pub fn columns(&self) -> Vec<String> {
        column_names(&self.data)
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<String>> {
        string_column(&self.data, name).with_context(|| format!("read {name} from {}", self.category))
    }

    pub fn records(&self) -> Result<Vec<BTreeMap<String, String>>> {
        frame_records(&self.data).with_context(|| format!("read {} output rows", self.category))
    }

    pub fn file_name(&self) -> String {
        self.category.file_name()
    }
}
