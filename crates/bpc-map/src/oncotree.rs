//! Oncotree code validation and cohort label canonicalization.

use std::collections::BTreeMap;

use tracing::warn;

use bpc_ingest::CsvTable;
use bpc_model::{AssetId, CaseInsensitiveSet};

use crate::error::MappingError;

const CODE_COLUMN: &[&str] = &["ONCOTREE_CODE", "code", "oncotree_code"];

/// Cohort ids that differ from the oncotree code of the same cancer type.
const COHORT_LABELS: &[(&str, &str)] = &[("RCC", "RENAL"), ("OVARY", "OVARIAN")];

/// Descriptive metadata of one oncotree code (column name to value).
pub type OncotreeEntry = BTreeMap<String, String>;

/// Reference dictionary keyed by oncotree code, looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OncotreeReference {
    entries: BTreeMap<String, OncotreeEntry>,
}

impl OncotreeReference {
    pub fn new(entries: BTreeMap<String, OncotreeEntry>) -> Self {
        Self { entries }
    }

    /// Build the reference from a table with an oncotree code column.
    pub fn from_table(table: &CsvTable, asset: &AssetId) -> Result<Self, MappingError> {
        let code_idx =
            table
                .column_index(CODE_COLUMN)
                .ok_or_else(|| MappingError::MissingColumn {
                    asset: asset.clone(),
                    column: "ONCOTREE_CODE".to_string(),
                })?;
        let mut entries = BTreeMap::new();
        for row in &table.rows {
            let code = row[code_idx].trim();
            if code.is_empty() {
                continue;
            }
            let entry: OncotreeEntry = table
                .headers
                .iter()
                .zip(row.iter())
                .enumerate()
                .filter(|(idx, _)| *idx != code_idx)
                .map(|(_, (header, value))| (header.to_ascii_uppercase(), value.clone()))
                .collect();
            entries.entry(code.to_string()).or_insert(entry);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &BTreeMap<String, OncotreeEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key_set(&self) -> CaseInsensitiveSet {
        CaseInsensitiveSet::new(self.entries.keys())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn get(&self, code: &str) -> Option<&OncotreeEntry> {
        let code = code.trim();
        self.entries.get(code).or_else(|| {
            self.entries
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(code))
                .map(|(_, entry)| entry)
        })
    }

    /// Entry for a cohort id, after canonicalizing cohort labels.
    pub fn cohort_entry(&self, cohort: &str) -> Option<OncotreeEntry> {
        canonicalize_cohort_labels(self).get(cohort).cloned()
    }
}

/// Report the oncotree codes that are not in the reference.
///
/// Blank codes are ignored. Distinct invalid values are returned in order of
/// first appearance, and a single warning lists them when there is at least
/// one. Rows are never altered.
pub fn validate<I, S>(codes: I, reference: &OncotreeReference) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let known = reference.key_set();
    let mut invalid: Vec<String> = Vec::new();
    for code in codes {
        let code = code.as_ref().trim();
        if code.is_empty() || known.contains(code) {
            continue;
        }
        if !invalid.iter().any(|seen| seen == code) {
            invalid.push(code.to_string());
        }
    }
    if let Some(message) = invalid_codes_message(&invalid) {
        warn!(invalid_count = invalid.len(), "{message}");
    }
    invalid
}

/// Warning text for a list of invalid codes, or None when the list is empty.
pub fn invalid_codes_message(invalid: &[String]) -> Option<String> {
    if invalid.is_empty() {
        return None;
    }
    let listing = invalid
        .iter()
        .map(|code| format!("'{code}'"))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "There are invalid values in ONCOTREE_CODE column in the clinical df: [{listing}]"
    ))
}

/// Copy of the reference with the renal and ovarian codes rekeyed to cohort labels.
///
/// `RCC` becomes `RENAL` and `OVARY` becomes `OVARIAN`, matched without regard
/// to case. Other keys and every value are returned unchanged. When two codes
/// land on the same key the later one in key order wins, with a warning.
pub fn canonicalize_cohort_labels(reference: &OncotreeReference) -> OncotreeReference {
    let mut entries = BTreeMap::new();
    for (code, entry) in &reference.entries {
        let key = COHORT_LABELS
            .iter()
            .find(|(from, _)| code.eq_ignore_ascii_case(from))
            .map_or_else(|| code.clone(), |(_, to)| (*to).to_string());
        if entries.insert(key.clone(), entry.clone()).is_some() {
            warn!(
                code = %code,
                key = %key,
                "oncotree code replaces an earlier entry for the same key"
            );
        }
    }
    OncotreeReference { entries }
}
