//! Provenance sidecars recorded next to each output file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bpc_ingest::AssetStore;
use bpc_model::{AssetId, Category};

use crate::common::write_atomic;

/// An asset consumed while producing an output, with its checksum when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedAsset {
    pub id: AssetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Lineage of one persisted output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub cohort: String,
    pub release: String,
    pub category: Category,
    pub file: String,
    pub record_count: usize,
    pub used: Vec<UsedAsset>,
    /// Reference to the pipeline source definition that produced the file.
    pub executed: String,
    pub generated_at: DateTime<Utc>,
}

impl Provenance {
    /// Sidecar file name for a category (`{CATEGORY}.provenance.json`).
    pub fn file_name(category: Category) -> String {
        format!("{}.provenance.json", category.name())
    }
}

/// Pair asset ids with the checksums the store recorded for them.
pub fn used_assets(ids: &[AssetId], store: &dyn AssetStore) -> Vec<UsedAsset> {
    ids.iter()
        .map(|id| UsedAsset {
            id: id.clone(),
            sha256: store.checksum(id),
        })
        .collect()
}

/// Write a provenance sidecar into `dir`.
pub fn write_provenance(dir: &Path, provenance: &Provenance) -> Result<PathBuf> {
    let path = dir.join(Provenance::file_name(provenance.category));
    let mut json =
        serde_json::to_string_pretty(provenance).context("serialize provenance record")?;
    json.push('\n');
    write_atomic(&path, json.as_bytes())?;
    Ok(path)
}

/// Read a provenance sidecar back.
pub fn read_provenance(path: &Path) -> Result<Provenance> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}
