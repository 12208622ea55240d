//! Output generation for cBioPortal import files.
//!
//! Each category is written as `{output}/{cohort}/{CATEGORY}.txt`, a
//! tab-delimited table, together with a `{CATEGORY}.provenance.json` sidecar
//! recording the assets it was derived from. Both files are replaced
//! atomically so an aborted run never leaves a partial file behind.

mod common;
mod provenance;
mod table;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use bpc_core::TargetTable;
use bpc_model::Category;

pub use common::write_atomic;
pub use provenance::{Provenance, UsedAsset, read_provenance, used_assets, write_provenance};
pub use table::{render_table, write_table};

/// Run-level fields recorded in every provenance sidecar.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext<'a> {
    pub cohort: &'a str,
    pub release: &'a str,
    pub source_definition: &'a str,
}

/// Files written for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenOutput {
    pub category: Category,
    pub path: PathBuf,
    pub provenance_path: PathBuf,
    pub record_count: usize,
}

/// Directory holding a cohort's output files.
pub fn cohort_dir(output_dir: &Path, cohort: &str) -> PathBuf {
    output_dir.join(cohort)
}

/// Persist a table and its provenance sidecar.
pub fn write_output(
    output_dir: &Path,
    context: &OutputContext<'_>,
    table: &TargetTable,
    used: Vec<UsedAsset>,
) -> Result<WrittenOutput> {
    let dir = cohort_dir(output_dir, context.cohort);
    let path = write_table(&dir, table)?;
    let record_count = table.record_count();
    let provenance = Provenance {
        cohort: context.cohort.to_string(),
        release: context.release.to_string(),
        category: table.category,
        file: table.file_name(),
        record_count,
        used,
        executed: context.source_definition.to_string(),
        generated_at: Utc::now(),
    };
    let provenance_path = write_provenance(&dir, &provenance)?;
    info!(
        cohort = context.cohort,
        category = %table.category,
        record_count,
        path = %path.display(),
        "wrote output"
    );
    Ok(WrittenOutput {
        category: table.category,
        path,
        provenance_path,
        record_count,
    })
}
