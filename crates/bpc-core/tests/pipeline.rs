//! Extraction and transform of a small NSCLC registry held in memory.

use bpc_core::{
    ExtractOptions, Extractor, SurvivalSummary, TargetTable, append_radiation,
    attach_clinical_header, create_output,
};
use bpc_ingest::{CsvTable, MemoryAssetStore};
use bpc_model::{AnchorConfig, AssetId, Category, CohortAssets, CohortConfig};

fn id(value: &str) -> AssetId {
    AssetId::new(value).expect("asset id")
}

fn table(headers: &[&str], rows: &[&[&str]]) -> CsvTable {
    CsvTable::from_records(headers, rows)
}

fn cohort() -> CohortConfig {
    CohortConfig {
        id: "NSCLC".to_string(),
        assets: CohortAssets {
            reference_set: id("syn_reference"),
            data_dictionary: id("syn_dictionary"),
            data_tables: id("syn_tables"),
            release_snapshot: id("syn_release"),
            prissmm: id("syn_prissmm"),
            assay_panel: id("syn_assay"),
            oncotree: id("syn_oncotree"),
            sample_retraction: id("syn_sample_retraction"),
            patient_retraction: id("syn_patient_retraction"),
            retraction_at_release: id("syn_release_retraction"),
            temporary_patient_retraction: id("syn_temp_retraction"),
        },
        exclude_files: Vec::new(),
        skip_categories: Vec::new(),
    }
}

fn store() -> MemoryAssetStore {
    let yes_no = "1, Yes | 0, No";
    let drugs = "1, Carboplatin | 2, Pemetrexed (Alimta)";
    let mapping = table(
        &["variable", "category", "dataset", "target_field", "choices"],
        &[
            &["drugs_drug_1", "", "Regimen", "", drugs],
            &["drugs_drug_2", "", "Regimen", "", drugs],
            &["dx_drug_start_int", "TIMELINE-TREATMENT", "Regimen", "START_DATE", ""],
            &["dx_drug_end_int", "TIMELINE-TREATMENT", "Regimen", "STOP_DATE", ""],
            &["rt_start_int", "TIMELINE-TREATMENT-RT", "Radiation", "START_DATE", ""],
            &["rt_dose", "TIMELINE-TREATMENT-RT", "Radiation", "RT_DOSE", ""],
            &["ca_dx_int", "TIMELINE-DX", "Diagnosis", "START_DATE", ""],
            &["stage_dx", "TIMELINE-DX", "Diagnosis", "STAGE", ""],
            &["image_scan_int", "TIMELINE-IMAGING", "Imaging", "START_DATE", ""],
            &["image_ca", "TIMELINE-IMAGING", "Imaging", "IMAGE_CANCER", yes_no],
            &["path_proc_int", "TIMELINE-SAMPLE", "Panel", "START_DATE", ""],
            &["hybrid_death_ind", "SURVIVAL", "Index", "OS_DX_STATUS", ""],
            &["tt_os_dx_days", "SURVIVAL", "Index", "OS_DX_MONTHS", ""],
            &["naaccr_sex_code", "PATIENT", "Patient", "SEX", "1, Male | 2, Female"],
            &["sample_type", "SAMPLE", "Panel", "SAMPLE_TYPE", ""],
        ],
    );
    let registry = table(
        &["dataset", "asset_id", "kind"],
        &[
            &["Regimen", "syn_regimen", "raw"],
            &["Radiation", "syn_rt", "raw"],
            &["Diagnosis", "syn_dx", "raw"],
            &["Imaging", "syn_imaging", "raw"],
            &["Index", "syn_index", "derived"],
            &["Patient", "syn_patient", "raw"],
            &["Panel", "syn_panel", "raw"],
        ],
    );
    MemoryAssetStore::new()
        .with_table(&id("syn_reference"), mapping.clone())
        .with_table(&id("syn_dictionary"), mapping)
        .with_table(&id("syn_tables"), registry)
        .with_table(
            &id("syn_regimen"),
            table(
                &[
                    "record_id",
                    "cohort",
                    "dx_drug_start_int",
                    "dx_drug_end_int",
                    "drugs_drug_1",
                    "drugs_drug_2",
                ],
                &[
                    &["P-1", "NSCLC", "110", "140", "1", "2"],
                    &["P-2", "NSCLC", "250", "", "2", ""],
                    &["P-3", "NSCLC", "120", "130", "1", ""],
                    &["P-4", "NSCLC", "260", "270", "1", ""],
                    &["P-5", "NSCLC", "90", "95", "2", ""],
                    &["P-9", "CRC", "100", "100", "1", ""],
                ],
            ),
        )
        .with_table(
            &id("syn_rt"),
            table(
                &["record_id", "rt_start_int", "rt_dose"],
                &[&["P-1", "150", "60"], &["P-3", "160", "45"]],
            ),
        )
        .with_table(
            &id("syn_dx"),
            table(
                &["record_id", "ca_dx_int", "stage_dx"],
                &[
                    &["P-1", "100", "Stage IV"],
                    &["P-2", "", "Stage II"],
                    &["P-3", "90", "Stage I"],
                ],
            ),
        )
        .with_table(
            &id("syn_imaging"),
            table(
                &["record_id", "image_scan_int", "image_ca"],
                &[&["P-1", "120", "1"], &["P-2", "", "0"], &["P-3", "130", "1"]],
            ),
        )
        .with_table(
            &id("syn_index"),
            table(
                &["record_id", "dob_ca_dx_days", "hybrid_death_ind", "tt_os_dx_days"],
                &[
                    &["P-1", "100", "1", "365.25"],
                    &["P-2", "200", "0", "730.5"],
                    &["P-3", "90", "1", "10"],
                    &["P-4", "200", "0", "60.875"],
                    &["P-5", "80", "1", "30.4375"],
                ],
            ),
        )
        .with_table(
            &id("syn_patient"),
            table(
                &["record_id", "naaccr_sex_code"],
                &[
                    &["P-1", "2"],
                    &["P-2", "1"],
                    &["P-3", "1"],
                    &["P-4", "2"],
                    &["P-5", "1"],
                ],
            ),
        )
        .with_table(
            &id("syn_panel"),
            table(
                &["record_id", "cpt_genie_sample_id", "sample_type", "path_proc_int"],
                &[
                    &["P-1", "S-1", "Primary", "105"],
                    &["P-1", "S-2", "Metastasis", "130"],
                    &["P-2", "S-3", "Primary", "210"],
                    &["P-3", "S-4", "Primary", "95"],
                ],
            ),
        )
        .with_table(
            &id("syn_release"),
            table(
                &["SAMPLE_ID", "PATIENT_ID", "SEQ_ASSAY_ID", "ONCOTREE_CODE"],
                &[
                    &["S-1", "P-1", "MSK-IMPACT468", "LUAD"],
                    &["S-2", "P-1", "MSK-IMPACT468", "LUAD"],
                    &["S-3", "P-2", "DFCI-ONCOPANEL-3", "XXX"],
                    &["S-4", "P-3", "MSK-IMPACT468", "LUSC"],
                ],
            ),
        )
        .with_table(
            &id("syn_assay"),
            table(
                &["SEQ_ASSAY_ID", "platform"],
                &[&["MSK-IMPACT468", "Hybrid Capture"]],
            ),
        )
        .with_table(
            &id("syn_oncotree"),
            table(
                &["code", "CANCER_TYPE", "NAME"],
                &[
                    &["LUAD", "Non-Small Cell Lung Cancer", "Lung Adenocarcinoma"],
                    &["NSCLC", "Non-Small Cell Lung Cancer", "Non-Small Cell Lung Cancer"],
                ],
            ),
        )
        .with_table(
            &id("syn_prissmm"),
            table(
                &["attribute", "label", "description", "data_type", "priority"],
                &[&["OS_DX_STATUS", "Overall Survival Status", "Vital status", "STRING", "1"]],
            ),
        )
        .with_table(
            &id("syn_sample_retraction"),
            table(&["SAMPLE_ID"], &[&["S-2"]]),
        )
        .with_table(
            &id("syn_patient_retraction"),
            table(&["record_id"], &[&["P-3"]]),
        )
        .with_table(
            &id("syn_release_retraction"),
            table(
                &["record_id", "release"],
                &[&["P-1", "1.0-public"], &["P-4", "1.1-consortium"]],
            ),
        )
        .with_table(
            &id("syn_temp_retraction"),
            table(&["record_id", "cohort"], &[&["P-2", "CRC"], &["P-5", "NSCLC"]]),
        )
}

fn options() -> ExtractOptions {
    ExtractOptions {
        use_reference_set: true,
        release: "1.1-consortium".to_string(),
        anchor: Some(AnchorConfig {
            dataset: "Index".to_string(),
            field: "dob_ca_dx_days".to_string(),
        }),
    }
}

fn output(store: &MemoryAssetStore, category: Category, filter_start: bool) -> TargetTable {
    let extractor = Extractor::new(store, options());
    let bundle = extractor.extract(&cohort(), category).expect("extract");
    create_output(&bundle, filter_start).expect("transform")
}

fn values(table: &TargetTable, column: &str) -> Vec<String> {
    table.column_values(column).expect("column")
}

#[test]
fn retracted_ids_never_reach_any_category() {
    let store = store();
    for category in Category::ALL {
        let table = output(&store, category, true);
        if table.columns().iter().any(|c| c == "PATIENT_ID") {
            let patients = values(&table, "PATIENT_ID");
            for retracted in ["P-3", "P-4", "P-5", "P-9"] {
                assert!(
                    !patients.iter().any(|p| p == retracted),
                    "{category}: {patients:?}"
                );
            }
        }
        if table.columns().iter().any(|c| c == "SAMPLE_ID") {
            let samples = values(&table, "SAMPLE_ID");
            assert!(!samples.iter().any(|s| s == "S-2" || s == "S-4"), "{category}");
        }
    }
}

#[test]
fn release_and_temporary_lists_hold_back_in_scope_patients() {
    let mut store = store();
    let before = output(&store, Category::TimelineTreatment, true);
    assert_eq!(values(&before, "PATIENT_ID"), vec!["P-1", "P-2"]);

    store.insert(
        &id("syn_release_retraction"),
        table(&["record_id", "release"], &[&["P-1", "1.0-public"]]),
    );
    store.insert(
        &id("syn_temp_retraction"),
        table(&["record_id", "cohort"], &[&["P-2", "CRC"]]),
    );
    let after = output(&store, Category::TimelineTreatment, true);
    let patients = values(&after, "PATIENT_ID");
    assert!(patients.iter().any(|p| p == "P-4"), "{patients:?}");
    assert!(patients.iter().any(|p| p == "P-5"), "{patients:?}");
    assert!(!patients.iter().any(|p| p == "P-3"));
}

#[test]
fn treatment_timeline_is_rebased_and_carries_agents() {
    let store = store();
    let table = output(&store, Category::TimelineTreatment, true);
    assert_eq!(values(&table, "PATIENT_ID"), vec!["P-1", "P-2"]);
    assert_eq!(values(&table, "START_DATE"), vec!["10", "50"]);
    assert_eq!(values(&table, "STOP_DATE"), vec!["40", ""]);
    assert_eq!(values(&table, "AGENT"), vec!["Carboplatin, Pemetrexed", "Pemetrexed"]);
    assert_eq!(values(&table, "AGENT_CODE"), vec!["1, 2", "2"]);
    assert_eq!(
        &table.columns()[..4],
        &["PATIENT_ID", "START_DATE", "STOP_DATE", "EVENT_TYPE"]
    );
}

#[test]
fn diagnosis_output_ignores_start_filter() {
    let store = store();
    let filtered = output(&store, Category::TimelineDx, true);
    let unfiltered = output(&store, Category::TimelineDx, false);
    assert_eq!(filtered.record_count(), 2);
    assert_eq!(
        filtered.records().expect("rows"),
        unfiltered.records().expect("rows")
    );
}

#[test]
fn other_timelines_filter_to_a_subset() {
    let store = store();
    let filtered = output(&store, Category::TimelineImaging, true);
    let unfiltered = output(&store, Category::TimelineImaging, false);
    let all = unfiltered.records().expect("rows");
    let kept = filtered.records().expect("rows");
    assert!(kept.len() < all.len());
    assert!(kept.iter().all(|row| all.contains(row)));
    assert_eq!(values(&filtered, "IMAGE_CANCER"), vec!["Yes"]);
}

#[test]
fn radiation_rows_are_appended_after_treatment() {
    let store = store();
    let treatment = output(&store, Category::TimelineTreatment, true);
    let radiation = output(&store, Category::TimelineTreatmentRt, true);
    let combined = append_radiation(&treatment, &radiation).expect("compose");
    assert_eq!(values(&combined, "PATIENT_ID"), vec!["P-1", "P-2", "P-1"]);
    assert_eq!(
        values(&combined, "TREATMENT_TYPE"),
        vec!["Systemic Therapy", "Systemic Therapy", "Radiation Therapy"]
    );
    assert_eq!(values(&combined, "RT_DOSE"), vec!["", "", "60"]);
}

#[test]
fn survival_outputs_are_converted_and_annotated() {
    let store = store();
    let extractor = Extractor::new(&store, options());
    let treatment = extractor
        .extract(&cohort(), Category::TimelineTreatment)
        .expect("extract");
    let summary = SurvivalSummary::compute(&treatment);
    let sources: Vec<&str> = summary.sources().iter().map(AssetId::as_str).collect();
    assert_eq!(sources, vec!["syn_reference", "syn_prissmm"]);

    let survival = output(&store, Category::Survival, true);
    assert_eq!(values(&survival, "OS_DX_STATUS"), vec!["1:DECEASED", "0:LIVING"]);
    assert_eq!(values(&survival, "OS_DX_MONTHS"), vec!["12.00", "24.00"]);

    let annotated = attach_clinical_header(survival, &summary).expect("header");
    let header = annotated.header.expect("header");
    assert_eq!(header[1].label, "Overall Survival Status");
}

#[test]
fn sample_clinical_joins_release_and_oncotree() {
    let store = store();
    let table = output(&store, Category::Sample, false);
    assert_eq!(values(&table, "SAMPLE_ID"), vec!["S-1", "S-3"]);
    assert_eq!(
        values(&table, "SEQ_ASSAY_ID"),
        vec!["MSK-IMPACT468", "DFCI-ONCOPANEL-3"]
    );
    assert_eq!(
        values(&table, "CANCER_TYPE_DETAILED"),
        vec!["Lung Adenocarcinoma", "Non-Small Cell Lung Cancer"]
    );
    assert_eq!(values(&table, "ONCOTREE_CODE"), vec!["LUAD", "XXX"]);
}

#[test]
fn extraction_records_every_asset_it_reads() {
    let store = store();
    let extractor = Extractor::new(&store, options());
    let bundle = extractor
        .extract(&cohort(), Category::TimelineTreatment)
        .expect("extract");
    let used: Vec<&str> = bundle.used.iter().map(AssetId::as_str).collect();
    assert_eq!(used[0], "syn_reference");
    for expected in ["syn_tables", "syn_regimen", "syn_index", "syn_prissmm"] {
        assert!(used.contains(&expected), "{expected} missing from {used:?}");
    }
    assert_eq!(bundle.excluded.len(), 4);
}

#[test]
fn missing_retraction_list_aborts_extraction() {
    let mut store = store();
    store.remove(&id("syn_temp_retraction"));
    let extractor = Extractor::new(&store, options());
    let error = extractor
        .extract(&cohort(), Category::TimelineImaging)
        .expect_err("missing list");
    assert!(format!("{error:#}").contains("syn_temp_retraction"));
}
