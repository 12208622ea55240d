//! Retraction lists: patients and samples that must never be published.
//!
//! Four independently maintained lists are consulted on every extraction and
//! unioned. An identifier in any list is excluded from every category; there
//! is no precedence between lists.

use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use tracing::debug;

use bpc_ingest::{AssetStore, CsvTable};
use bpc_model::{AssetId, COHORT_KEY, CohortConfig};

const ID_COLUMN: &[&str] = &[
    "record_id",
    "patient_id",
    "PATIENT_ID",
    "SAMPLE_ID",
    "sample_id",
    "cpt_genie_sample_id",
    "id",
];
const RELEASE_COLUMN: &[&str] = &["release", "release_version"];

/// Union of retracted patient and sample identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedIds {
    ids: BTreeSet<String>,
}

impl ExcludedIds {
    pub fn contains(&self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty() && self.ids.contains(id)
    }

    /// True when any of the given identifiers is retracted.
    pub fn excludes_any<'a, I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().any(|id| self.contains(id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExcludedIds {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let ids = iter
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        Self { ids }
    }
}

/// Which scoping columns a list honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListScope {
    Cohort,
    CohortRelease,
}

pub struct RetractionFilter<'a> {
    store: &'a dyn AssetStore,
}

impl<'a> RetractionFilter<'a> {
    pub fn new(store: &'a dyn AssetStore) -> Self {
        Self { store }
    }

    /// Fetch all four lists for a cohort and return their union.
    ///
    /// Rows carrying a `cohort` column only apply to that cohort; the
    /// retraction-at-release list is further restricted by its `release`
    /// column when present. A list that cannot be fetched fails the call.
    pub fn excluded_ids(&self, cohort: &CohortConfig, release: &str) -> Result<ExcludedIds> {
        let assets = &cohort.assets;
        let lists = [
            (&assets.sample_retraction, ListScope::Cohort),
            (&assets.patient_retraction, ListScope::Cohort),
            (&assets.retraction_at_release, ListScope::CohortRelease),
            (&assets.temporary_patient_retraction, ListScope::Cohort),
        ];
        let mut ids: BTreeSet<String> = BTreeSet::new();
        for (asset, scope) in lists {
            let table = self
                .store
                .read_table(asset)
                .with_context(|| format!("fetch retraction list {asset}"))?;
            let list_ids = list_ids(&table, asset, &cohort.id, release, scope)?;
            debug!(asset = %asset, count = list_ids.len(), "read retraction list");
            ids.extend(list_ids);
        }
        Ok(ExcludedIds { ids })
    }
}

fn list_ids(
    table: &CsvTable,
    asset: &AssetId,
    cohort: &str,
    release: &str,
    scope: ListScope,
) -> Result<Vec<String>> {
    let Some(id_idx) = table.column_index(ID_COLUMN) else {
        bail!("retraction list {asset} has no identifier column");
    };
    let cohort_idx = table.column_index(&[COHORT_KEY]);
    let release_idx = match scope {
        ListScope::CohortRelease => table.column_index(RELEASE_COLUMN),
        ListScope::Cohort => None,
    };
    let ids = table
        .rows
        .iter()
        .filter(|row| matches_scope(row, cohort_idx, cohort))
        .filter(|row| matches_scope(row, release_idx, release))
        .map(|row| row[id_idx].trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    Ok(ids)
}

fn matches_scope(row: &[String], idx: Option<usize>, wanted: &str) -> bool {
    match idx {
        Some(idx) => {
            let value = row[idx].trim();
            value.is_empty() || value.eq_ignore_ascii_case(wanted.trim())
        }
        None => true,
    }
}
