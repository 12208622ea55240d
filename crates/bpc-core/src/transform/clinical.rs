//! Clinical transforms: survival, regimen, sample and patient attribute files.

use anyhow::Result;
use tracing::debug;

use bpc_ingest::parse_f64;
use bpc_map::{OncotreeEntry, OncotreeReference, validate};
use bpc_model::{MappingRow, ONCOTREE_CODE, PATIENT_ID, SAMPLE_ID, SEQ_ASSAY_ID};

use super::CategoryTransform;
use super::common::{OutputRows, Record, ValueHook, drug_labels, map_rows};
use crate::extract::ExtractBundle;
use crate::frame::TargetTable;

const REGIMEN_DRUGS: &str = "REGIMEN_DRUGS";
const CANCER_TYPE: &str = "CANCER_TYPE";
const CANCER_TYPE_DETAILED: &str = "CANCER_TYPE_DETAILED";
const CANCER_TYPE_KEYS: &[&str] = &["CANCER_TYPE", "MAINTYPE", "MAIN_TYPE"];
const CANCER_TYPE_DETAILED_KEYS: &[&str] = &["CANCER_TYPE_DETAILED", "NAME"];

const DAYS_PER_MONTH: f64 = 30.4375;

/// Survival outcomes, one row per patient.
pub struct SurvivalClinical;

/// Survival outcomes per regimen, with the regimen's drugs.
pub struct RegimenClinical;

/// Sample attributes, one row per released sample.
pub struct SampleClinical;

/// Patient attributes, one row per patient.
pub struct PatientClinical;

impl CategoryTransform for SurvivalClinical {
    fn name(&self) -> &'static str {
        "survival-clinical"
    }

    fn create_output(&self, bundle: &ExtractBundle, _filter_start: bool) -> Result<TargetTable> {
        let mapped = map_rows(bundle, Some(survival_value as ValueHook))?;
        let mut output = OutputRows::new(&[PATIENT_ID]);
        output.add_columns(&mapped.targets);
        for source in mapped.rows {
            let mut record = source.mapped;
            record.insert(PATIENT_ID.to_string(), source.patient_id.clone());
            output.push_merged(&source.patient_id, record);
        }
        output.into_table(bundle.category)
    }
}

impl CategoryTransform for RegimenClinical {
    fn name(&self) -> &'static str {
        "regimen-clinical"
    }

    fn create_output(&self, bundle: &ExtractBundle, _filter_start: bool) -> Result<TargetTable> {
        let mapped = map_rows(bundle, Some(survival_value as ValueHook))?;
        let mut output = OutputRows::new(&[PATIENT_ID]);
        output.add_columns(&mapped.targets);
        output.add_columns(&[REGIMEN_DRUGS]);
        for source in mapped.rows {
            let drugs = drug_labels(&source.raw, &bundle.catalog).join(", ");
            let mut record = source.mapped;
            record.insert(PATIENT_ID.to_string(), source.patient_id);
            let slot = record.entry(REGIMEN_DRUGS.to_string()).or_default();
            if slot.is_empty() {
                *slot = drugs;
            }
            output.push(record);
        }
        output.into_table(bundle.category)
    }
}

impl CategoryTransform for SampleClinical {
    fn name(&self) -> &'static str {
        "sample-clinical"
    }

    fn description(&self) -> &'static str {
        "Sample attributes joined with the release snapshot and oncotree reference"
    }

    fn create_output(&self, bundle: &ExtractBundle, _filter_start: bool) -> Result<TargetTable> {
        let mapped = map_rows(bundle, None)?;
        let mut output = OutputRows::new(&[SAMPLE_ID, PATIENT_ID]);
        output.add_columns(&mapped.targets);
        output.add_columns(&[SEQ_ASSAY_ID, ONCOTREE_CODE, CANCER_TYPE, CANCER_TYPE_DETAILED]);

        let mut unreleased = 0usize;
        for source in mapped.rows {
            if source.sample_id.is_empty() {
                continue;
            }
            let release = match &bundle.release_samples {
                Some(samples) => match samples.get(source.sample_id.as_str()) {
                    Some(sample) => Some(sample),
                    None => {
                        unreleased += 1;
                        continue;
                    }
                },
                None => None,
            };
            let mut record = source.mapped;
            record.insert(SAMPLE_ID.to_string(), source.sample_id.clone());
            record.insert(PATIENT_ID.to_string(), source.patient_id);
            if let Some(sample) = release {
                fill_empty(&mut record, SEQ_ASSAY_ID, &sample.seq_assay_id);
                fill_empty(&mut record, ONCOTREE_CODE, &sample.oncotree_code);
            }
            output.push_merged(&source.sample_id, record);
        }
        debug!(unreleased, "dropped samples missing from the release snapshot");

        if let Some(reference) = &bundle.oncotree {
            let codes: Vec<String> = output
                .records()
                .iter()
                .map(|record| record.get(ONCOTREE_CODE).cloned().unwrap_or_default())
                .collect();
            let invalid = validate(&codes, reference);
            debug!(invalid = invalid.len(), "validated oncotree codes");
            let cohort_entry = reference.cohort_entry(&bundle.cohort);
            for record in output.records_mut() {
                fill_cancer_types(record, reference, cohort_entry.as_ref());
            }
        }
        output.into_table(bundle.category)
    }
}

impl CategoryTransform for PatientClinical {
    fn name(&self) -> &'static str {
        "patient-clinical"
    }

    fn create_output(&self, bundle: &ExtractBundle, _filter_start: bool) -> Result<TargetTable> {
        let mapped = map_rows(bundle, None)?;
        let mut output = OutputRows::new(&[PATIENT_ID]);
        output.add_columns(&mapped.targets);
        for source in mapped.rows {
            let mut record = source.mapped;
            record.insert(PATIENT_ID.to_string(), source.patient_id.clone());
            output.push_merged(&source.patient_id, record);
        }
        output.into_table(bundle.category)
    }
}

fn fill_empty(record: &mut Record, column: &str, value: &str) {
    let slot = record.entry(column.to_string()).or_default();
    if slot.trim().is_empty() {
        *slot = value.trim().to_string();
    }
}

fn entry_value<'a>(entry: &'a OncotreeEntry, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| entry.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Fill cancer types from the row's oncotree entry, else from the cohort's entry.
fn fill_cancer_types(
    record: &mut Record,
    reference: &OncotreeReference,
    cohort_entry: Option<&OncotreeEntry>,
) {
    let code = record.get(ONCOTREE_CODE).map_or("", |v| v.trim());
    let entry = reference.get(code).or(cohort_entry);
    let Some(entry) = entry else {
        return;
    };
    let cancer_type = entry_value(entry, CANCER_TYPE_KEYS).unwrap_or_default().to_string();
    let detailed = entry_value(entry, CANCER_TYPE_DETAILED_KEYS)
        .unwrap_or_default()
        .to_string();
    fill_empty(record, CANCER_TYPE, &cancer_type);
    fill_empty(record, CANCER_TYPE_DETAILED, &detailed);
}

/// Status and month conversions of survival targets.
///
/// `OS_*_STATUS` becomes `1:DECEASED` / `0:LIVING`, `PFS_*_STATUS` becomes
/// `1:PROGRESSED` / `0:CENSORED`, and a `*_MONTHS` target read from a
/// `*_days` source is converted to months with two decimals. Values that do
/// not match pass through.
fn survival_value(row: &MappingRow, value: &str) -> String {
    let target = row.target_field.trim().to_ascii_uppercase();
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }
    if target.ends_with("_STATUS") {
        let lower = value.to_ascii_lowercase();
        let status = if target.starts_with("OS_") {
            match lower.as_str() {
                "1" | "yes" | "true" | "deceased" | "dead" => Some("1:DECEASED"),
                "0" | "no" | "false" | "living" | "alive" => Some("0:LIVING"),
                _ => None,
            }
        } else if target.starts_with("PFS_") {
            match lower.as_str() {
                "1" | "yes" | "true" | "progressed" => Some("1:PROGRESSED"),
                "0" | "no" | "false" | "censored" => Some("0:CENSORED"),
                _ => None,
            }
        } else {
            None
        };
        return status.map_or_else(|| value.to_string(), str::to_string);
    }
    if target.ends_with("_MONTHS")
        && row.source_field.to_ascii_lowercase().ends_with("_days")
        && let Some(days) = parse_f64(value)
    {
        return format!("{:.2}", days / DAYS_PER_MONTH);
    }
    value.to_string()
}
