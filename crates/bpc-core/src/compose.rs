//! Post-processing of transform outputs before they are persisted.

use anyhow::{Context, Result, ensure};
use polars::prelude::DataFrame;

use bpc_ingest::{column_names, frame_records, records_to_frame};
use bpc_model::{Category, CategoryKind};

use crate::frame::TargetTable;
use crate::survival::SurvivalSummary;

/// Append the radiation treatment rows after the systemic treatment rows.
///
/// The result is the treatment timeline; its columns are the treatment
/// columns followed by any radiation-only columns.
pub fn append_radiation(treatment: &TargetTable, radiation: &TargetTable) -> Result<TargetTable> {
    ensure!(
        treatment.category == Category::TimelineTreatment,
        "expected {} output, got {}",
        Category::TimelineTreatment,
        treatment.category
    );
    ensure!(
        radiation.category == Category::TimelineTreatmentRt,
        "expected {} output, got {}",
        Category::TimelineTreatmentRt,
        radiation.category
    );
    let data = stack_frames(&treatment.data, &radiation.data)
        .context("append radiation rows to treatment timeline")?;
    Ok(TargetTable::new(Category::TimelineTreatment, data))
}

fn stack_frames(top: &DataFrame, bottom: &DataFrame) -> Result<DataFrame> {
    let mut columns = column_names(top);
    for column in column_names(bottom) {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    let mut records = frame_records(top)?;
    records.extend(frame_records(bottom)?);
    Ok(records_to_frame(&columns, &records)?)
}

/// Attach clinical attribute metadata for the table's columns.
pub fn attach_clinical_header(table: TargetTable, summary: &SurvivalSummary) -> Result<TargetTable> {
    ensure!(
        table.category.kind() == CategoryKind::Clinical,
        "{} is not a clinical category",
        table.category
    );
    let header = summary.header_for(&table.columns());
    Ok(TargetTable {
        header: Some(header),
        ..table
    })
}
