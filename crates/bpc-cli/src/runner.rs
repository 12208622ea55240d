//! Cohort orchestration.
//!
//! The treatment timeline is extracted and transformed once per run, and the
//! survival summary is computed from that same bundle. Both are then shared
//! by reference with every later category. Radiation rows are appended to the
//! treatment timeline instead of getting a file of their own.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use bpc_core::{
    ExtractOptions, Extractor, SurvivalSummary, TargetTable, append_radiation,
    attach_clinical_header, create_output,
};
use bpc_ingest::AssetStore;
use bpc_model::{AssetId, Category, CategoryKind, CohortConfig, ReleaseSettings};
use bpc_report::{OutputContext, used_assets, write_output};

use crate::types::{CategoryStatus, CategorySummary, CohortRun};

/// Per-run options from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub release: String,
    pub output_dir: PathBuf,
    /// Map through the generic data dictionary instead of the reference set.
    pub use_data_dictionary: bool,
    pub dry_run: bool,
}

/// Export every category of one cohort.
///
/// # Errors
///
/// Any failed fetch, transform or write aborts the cohort. Files already
/// written stay in place; a partially written file never does.
pub fn run_cohort(
    store: &dyn AssetStore,
    settings: &ReleaseSettings,
    cohort: &CohortConfig,
    options: &RunOptions,
) -> Result<CohortRun> {
    let span = info_span!("cohort", cohort = %cohort.id, release = %options.release);
    let _guard = span.enter();
    let start = Instant::now();

    let extractor = Extractor::new(
        store,
        ExtractOptions {
            use_reference_set: !options.use_data_dictionary,
            release: options.release.clone(),
            anchor: settings.anchor.clone(),
        },
    );
    let sink = OutputSink {
        store,
        options,
        context: OutputContext {
            cohort: &cohort.id,
            release: &options.release,
            source_definition: &settings.source_definition,
        },
    };

    let treatment_bundle = extractor
        .extract(cohort, Category::TimelineTreatment)
        .with_context(|| format!("extract {} for {}", Category::TimelineTreatment, cohort.id))?;
    let survival = SurvivalSummary::compute(&treatment_bundle);
    let treatment = create_output(&treatment_bundle, true)
        .with_context(|| format!("transform {} for {}", Category::TimelineTreatment, cohort.id))?;
    let treatment_used = treatment_bundle.used;

    let mut treatment_summary = None;
    let mut categories = Vec::new();
    for category in Category::ALL.into_iter().skip(1) {
        if cohort.skips(category) {
            categories.push(CategorySummary::not_produced(category, CategoryStatus::Skipped));
            continue;
        }
        if cohort.excludes_output(category) {
            info!(category = %category, "output excluded for cohort");
            categories.push(CategorySummary::not_produced(category, CategoryStatus::Excluded));
            continue;
        }

        let bundle = extractor
            .extract(cohort, category)
            .with_context(|| format!("extract {category} for {}", cohort.id))?;
        let table = create_output(&bundle, category != Category::TimelineDx)
            .with_context(|| format!("transform {category} for {}", cohort.id))?;

        match category {
            Category::TimelineTreatmentRt => {
                let combined = append_radiation(&treatment, &table)?;
                let used = merge_used(&treatment_used, &bundle.used);
                treatment_summary = Some(sink.persist_treatment(cohort, &combined, &used)?);
                categories.push(CategorySummary {
                    category,
                    status: CategoryStatus::Composed,
                    records: Some(table.record_count()),
                    path: None,
                });
            }
            _ if category.kind() == CategoryKind::Clinical => {
                let table = attach_clinical_header(table, &survival)?;
                let used = merge_used(&bundle.used, survival.sources());
                categories.push(sink.persist(&table, &used)?);
            }
            _ => categories.push(sink.persist(&table, &bundle.used)?),
        }
    }

    let treatment_summary = match treatment_summary {
        Some(summary) => summary,
        None => sink.persist_treatment(cohort, &treatment, &treatment_used)?,
    };
    categories.insert(0, treatment_summary);

    let run = CohortRun {
        cohort: cohort.id.clone(),
        release: options.release.clone(),
        output_dir: options.output_dir.clone(),
        dry_run: options.dry_run,
        categories,
    };
    info!(
        record_count = run.total_records(),
        dry_run = options.dry_run,
        duration_ms = start.elapsed().as_millis(),
        "cohort complete"
    );
    Ok(run)
}

struct OutputSink<'a> {
    store: &'a dyn AssetStore,
    options: &'a RunOptions,
    context: OutputContext<'a>,
}

impl OutputSink<'_> {
    fn persist(&self, table: &TargetTable, used: &[AssetId]) -> Result<CategorySummary> {
        if self.options.dry_run {
            return Ok(CategorySummary {
                category: table.category,
                status: CategoryStatus::DryRun,
                records: Some(table.record_count()),
                path: None,
            });
        }
        let written = write_output(
            &self.options.output_dir,
            &self.context,
            table,
            used_assets(used, self.store),
        )
        .with_context(|| format!("write {} for {}", table.category, self.context.cohort))?;
        Ok(CategorySummary {
            category: written.category,
            status: CategoryStatus::Written,
            records: Some(written.record_count),
            path: Some(written.path),
        })
    }

    fn persist_treatment(
        &self,
        cohort: &CohortConfig,
        table: &TargetTable,
        used: &[AssetId],
    ) -> Result<CategorySummary> {
        if cohort.excludes_output(Category::TimelineTreatment) {
            info!(category = %Category::TimelineTreatment, "output excluded for cohort");
            return Ok(CategorySummary::not_produced(
                Category::TimelineTreatment,
                CategoryStatus::Excluded,
            ));
        }
        self.persist(table, used)
    }
}

/// `base` followed by any assets from `extra` it does not already list.
fn merge_used(base: &[AssetId], extra: &[AssetId]) -> Vec<AssetId> {
    let mut used = base.to_vec();
    for id in extra {
        if !used.contains(id) {
            used.push(id.clone());
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<AssetId> {
        values
            .iter()
            .map(|value| AssetId::new(*value).expect("asset id"))
            .collect()
    }

    #[test]
    fn merged_assets_keep_treatment_order() {
        let merged = merge_used(&ids(&["syn_a", "syn_b"]), &ids(&["syn_b", "syn_rt"]));
        assert_eq!(merged, ids(&["syn_a", "syn_b", "syn_rt"]));
    }
}
