pub mod category;
pub mod cohort;
pub mod error;
pub mod ids;
pub mod lookup;
pub mod mapping;

pub use category::{Category, CategoryKind, CategorySpec, RecordLevel};
pub use cohort::{AnchorConfig, CohortAssets, CohortConfig, ReleaseSettings};
pub use error::{ModelError, Result};
pub use ids::AssetId;
pub use lookup::CaseInsensitiveSet;
pub use mapping::{ClinicalAttribute, MappingRow};

/// Patient identifier column in registry tables.
pub const PATIENT_KEY: &str = "record_id";
/// Sample identifier column in registry tables.
pub const SAMPLE_KEY: &str = "cpt_genie_sample_id";
/// Cohort column used to scope shared tables.
pub const COHORT_KEY: &str = "cohort";

pub const PATIENT_ID: &str = "PATIENT_ID";
pub const SAMPLE_ID: &str = "SAMPLE_ID";
pub const START_DATE: &str = "START_DATE";
pub const STOP_DATE: &str = "STOP_DATE";
pub const EVENT_TYPE: &str = "EVENT_TYPE";
pub const ONCOTREE_CODE: &str = "ONCOTREE_CODE";
pub const SEQ_ASSAY_ID: &str = "SEQ_ASSAY_ID";
