use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::ids::AssetId;

/// External assets consumed for one cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortAssets {
    /// Pre-validated mapping reference set.
    pub reference_set: AssetId,
    /// Generic data dictionary, same shape as the reference set.
    pub data_dictionary: AssetId,
    /// Registry of raw and derived data tables.
    pub data_tables: AssetId,
    /// Main GENIE release clinical sample snapshot.
    pub release_snapshot: AssetId,
    pub prissmm: AssetId,
    pub assay_panel: AssetId,
    pub oncotree: AssetId,
    pub sample_retraction: AssetId,
    pub patient_retraction: AssetId,
    pub retraction_at_release: AssetId,
    pub temporary_patient_retraction: AssetId,
}

impl CohortAssets {
    /// The four retraction list references.
    pub fn retraction_lists(&self) -> [&AssetId; 4] {
        [
            &self.sample_retraction,
            &self.patient_retraction,
            &self.retraction_at_release,
            &self.temporary_patient_retraction,
        ]
    }

    pub fn mapping(&self, use_reference_set: bool) -> &AssetId {
        if use_reference_set {
            &self.reference_set
        } else {
            &self.data_dictionary
        }
    }
}

/// One sponsored-project cohort. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortConfig {
    pub id: String,
    pub assets: CohortAssets,
    /// Output file names this cohort must never produce.
    #[serde(default)]
    pub exclude_files: Vec<String>,
    /// Categories the source registry never populates for this cohort.
    #[serde(default)]
    pub skip_categories: Vec<Category>,
}

impl CohortConfig {
    pub fn skips(&self, category: Category) -> bool {
        self.skip_categories.contains(&category)
    }

    /// True when the exclusion list names either the output file or its legacy name.
    pub fn excludes_output(&self, category: Category) -> bool {
        let file_name = category.file_name();
        let legacy = category.spec().legacy_file;
        self.exclude_files.iter().any(|name| {
            let name = name.trim();
            name.eq_ignore_ascii_case(&file_name) || name.eq_ignore_ascii_case(legacy)
        })
    }

    pub fn produces(&self, category: Category) -> bool {
        !self.skips(category) && !self.excludes_output(category)
    }
}

/// Derived dataset and column holding each patient's index day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorConfig {
    pub dataset: String,
    #[serde(default = "default_anchor_field")]
    pub field: String,
}

fn default_anchor_field() -> String {
    "dob_ca_dx_days".to_string()
}

/// Settings shared by every cohort of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSettings {
    /// Reference to the pipeline source definition, recorded in provenance.
    pub source_definition: String,
    #[serde(default)]
    pub anchor: Option<AnchorConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> AssetId {
        AssetId::new(id).expect("asset id")
    }

    fn sample_cohort() -> CohortConfig {
        CohortConfig {
            id: "NSCLC".to_string(),
            assets: CohortAssets {
                reference_set: asset("syn_ref"),
                data_dictionary: asset("syn_dd"),
                data_tables: asset("syn_tables"),
                release_snapshot: asset("syn_release"),
                prissmm: asset("syn_prissmm"),
                assay_panel: asset("syn_assay"),
                oncotree: asset("syn_oncotree"),
                sample_retraction: asset("syn_sr"),
                patient_retraction: asset("syn_pr"),
                retraction_at_release: asset("syn_rr"),
                temporary_patient_retraction: asset("syn_tr"),
            },
            exclude_files: vec!["data_timeline_labtest.txt".to_string()],
            skip_categories: vec![Category::TimelinePerformance],
        }
    }

    #[test]
    fn exclusion_accepts_legacy_and_category_names() {
        let mut cohort = sample_cohort();
        assert!(cohort.excludes_output(Category::TimelineLab));
        assert!(!cohort.excludes_output(Category::TimelineImaging));
        cohort.exclude_files.push("timeline-imaging.txt".to_string());
        assert!(cohort.excludes_output(Category::TimelineImaging));
    }

    #[test]
    fn produces_combines_skip_and_exclusion() {
        let cohort = sample_cohort();
        assert!(!cohort.produces(Category::TimelinePerformance));
        assert!(!cohort.produces(Category::TimelineLab));
        assert!(cohort.produces(Category::TimelineDx));
    }

    #[test]
    fn mapping_asset_follows_flag() {
        let cohort = sample_cohort();
        assert_eq!(cohort.assets.mapping(true).as_str(), "syn_ref");
        assert_eq!(cohort.assets.mapping(false).as_str(), "syn_dd");
        assert_eq!(cohort.assets.retraction_lists()[2].as_str(), "syn_rr");
    }

    #[test]
    fn skip_categories_deserialize_from_names() {
        let parsed: Vec<Category> =
            serde_json::from_str(r#"["TIMELINE-LAB", "timeline-treatment-rt"]"#)
                .expect("categories");
        assert_eq!(
            parsed,
            vec![Category::TimelineLab, Category::TimelineTreatmentRt]
        );
    }
}
