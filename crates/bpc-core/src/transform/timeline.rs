//! Timeline transforms: one event per source row, positioned in days relative
//! to the patient's index date.

use anyhow::Result;
use tracing::debug;

use bpc_model::{EVENT_TYPE, PATIENT_ID, RecordLevel, SAMPLE_ID, SEQ_ASSAY_ID, START_DATE, STOP_DATE};

use super::CategoryTransform;
use super::common::{
    OutputRows, Record, SourceRow, drug_labels, has_drug_columns, map_rows, rebase_day,
};
use crate::extract::ExtractBundle;
use crate::frame::TargetTable;

const AGENT: &str = "AGENT";
const AGENT_CODE: &str = "AGENT_CODE";
const TREATMENT_TYPE: &str = "TREATMENT_TYPE";

/// Generic event timeline (imaging, medical oncology, pathology, labs, radiation).
pub struct EventTimeline;

/// Systemic treatment timeline with drug agents and their codes.
pub struct TreatmentTimeline;

/// Performance status timeline; rows without a recorded value are dropped.
pub struct PerformanceTimeline;

/// Cancer diagnosis timeline; never filtered on START_DATE.
pub struct DiagnosisTimeline;

/// Sample acquisition and sequencing timelines, restricted to released samples.
pub struct SampleTimeline;

impl CategoryTransform for EventTimeline {
    fn name(&self) -> &'static str {
        "event-timeline"
    }

    fn create_output(&self, bundle: &ExtractBundle, filter_start: bool) -> Result<TargetTable> {
        build_timeline(bundle, filter_start, |_, _| true)
    }
}

impl CategoryTransform for TreatmentTimeline {
    fn name(&self) -> &'static str {
        "treatment-timeline"
    }

    fn description(&self) -> &'static str {
        "Systemic therapy events with AGENT and AGENT_CODE"
    }

    fn create_output(&self, bundle: &ExtractBundle, filter_start: bool) -> Result<TargetTable> {
        build_timeline(bundle, filter_start, |source, record| {
            if has_drug_columns(&source.raw) {
                let labels = drug_labels(&source.raw, &bundle.catalog);
                let codes: Vec<&str> = labels
                    .iter()
                    .filter_map(|label| bundle.drug_codes.translate(label))
                    .collect();
                record.insert(AGENT.to_string(), labels.join(", "));
                record.insert(AGENT_CODE.to_string(), codes.join(", "));
            }
            true
        })
    }
}

impl CategoryTransform for PerformanceTimeline {
    fn name(&self) -> &'static str {
        "performance-timeline"
    }

    fn create_output(&self, bundle: &ExtractBundle, filter_start: bool) -> Result<TargetTable> {
        build_timeline(bundle, filter_start, |source, _| {
            source.mapped.iter().any(|(column, value)| {
                !is_position_column(column) && !value.trim().is_empty()
            })
        })
    }
}

impl CategoryTransform for DiagnosisTimeline {
    fn name(&self) -> &'static str {
        "diagnosis-timeline"
    }

    fn create_output(&self, bundle: &ExtractBundle, _filter_start: bool) -> Result<TargetTable> {
        build_timeline(bundle, false, |_, _| true)
    }
}

impl CategoryTransform for SampleTimeline {
    fn name(&self) -> &'static str {
        "sample-timeline"
    }

    fn description(&self) -> &'static str {
        "Specimen and sequencing events joined with the release snapshot"
    }

    fn create_output(&self, bundle: &ExtractBundle, filter_start: bool) -> Result<TargetTable> {
        build_timeline(bundle, filter_start, |source, record| {
            let Some(samples) = &bundle.release_samples else {
                return true;
            };
            let Some(sample) = samples.get(source.sample_id.as_str()) else {
                return false;
            };
            record.insert(SEQ_ASSAY_ID.to_string(), sample.seq_assay_id.clone());
            if let Some(attributes) = bundle
                .assay_panels
                .as_ref()
                .and_then(|panels| panels.get(sample.seq_assay_id.as_str()))
            {
                for (column, value) in attributes {
                    record
                        .entry(column.clone())
                        .or_insert_with(|| value.clone());
                }
            }
            true
        })
    }
}

fn is_position_column(column: &str) -> bool {
    matches!(
        column,
        PATIENT_ID | START_DATE | STOP_DATE | EVENT_TYPE | SAMPLE_ID
    )
}

/// Map, derive and optionally filter the rows of one timeline category.
///
/// `derive` adds category columns to a mapped record and returns false to
/// drop the row.
fn build_timeline<F>(bundle: &ExtractBundle, filter_start: bool, mut derive: F) -> Result<TargetTable>
where
    F: FnMut(&SourceRow, &mut Record) -> bool,
{
    let spec = bundle.category.spec();
    let sample_level = spec.level == RecordLevel::Sample;
    let leading: &[&str] = if sample_level {
        &[PATIENT_ID, START_DATE, STOP_DATE, EVENT_TYPE, SAMPLE_ID]
    } else {
        &[PATIENT_ID, START_DATE, STOP_DATE, EVENT_TYPE]
    };

    let mapped = map_rows(bundle, None)?;
    let mut output = OutputRows::new(leading);
    output.add_columns(&mapped.targets);
    if spec.treatment_type.is_some() {
        output.add_columns(&[TREATMENT_TYPE]);
    }
    if spec.derives_agents {
        output.add_columns(&[AGENT, AGENT_CODE]);
    }

    let mut dropped = 0usize;
    for source in &mapped.rows {
        let mut record = source.mapped.clone();
        record.insert(PATIENT_ID.to_string(), source.patient_id.clone());
        if sample_level {
            record.insert(SAMPLE_ID.to_string(), source.sample_id.clone());
        }
        for column in [START_DATE, STOP_DATE] {
            let value = record.get(column).cloned().unwrap_or_default();
            let day = rebase_day(&value, &source.patient_id, bundle.anchors.as_ref());
            record.insert(column.to_string(), day);
        }
        fill_default(&mut record, EVENT_TYPE, spec.event_type);
        fill_default(&mut record, TREATMENT_TYPE, spec.treatment_type);
        if derive(source, &mut record) {
            output.push(record);
        } else {
            dropped += 1;
        }
    }

    if filter_start && !spec.start_filter_exempt {
        let before = output.len();
        output.retain(|record| record.get(START_DATE).is_some_and(|v| !v.trim().is_empty()));
        debug!(
            category = %bundle.category,
            removed = before - output.len(),
            "filtered rows without START_DATE"
        );
    }
    debug!(category = %bundle.category, dropped, "derived timeline rows");
    output.into_table(bundle.category)
}

fn fill_default(record: &mut Record, column: &str, default: Option<&str>) {
    let Some(default) = default else {
        return;
    };
    let slot = record.entry(column.to_string()).or_default();
    if slot.trim().is_empty() {
        *slot = default.to_string();
    }
}
