//! Cohort configuration loading.
//!
//! A `cohorts.toml` file names the release settings, a default asset table
//! shared by every cohort, and one `[[cohorts]]` entry per sponsored project.
//! Per-cohort `assets` tables override individual defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use bpc_model::{AssetId, Category, CohortAssets, CohortConfig, ReleaseSettings};

use crate::error::ConfigError;

/// Environment variable for overriding the cohort config path.
pub const CONFIG_ENV_VAR: &str = "BPC_EXPORT_CONFIG";
pub const CONFIG_SCHEMA: &str = "bpc-export.cohorts";
pub const DEFAULT_CONFIG_PATH: &str = "config/cohorts.toml";

/// Resolve the config path: explicit path, then `BPC_EXPORT_CONFIG`, then the default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    config: RawHeader,
    release: ReleaseSettings,
    #[serde(default)]
    assets: AssetOverrides,
    #[serde(default)]
    cohorts: Vec<RawCohort>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    schema: String,
    schema_version: u32,
}

#[derive(Debug, Deserialize)]
struct RawCohort {
    id: String,
    #[serde(default)]
    assets: AssetOverrides,
    #[serde(default)]
    exclude_files: Vec<String>,
    #[serde(default)]
    skip_categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AssetOverrides {
    reference_set: Option<AssetId>,
    data_dictionary: Option<AssetId>,
    data_tables: Option<AssetId>,
    release_snapshot: Option<AssetId>,
    prissmm: Option<AssetId>,
    assay_panel: Option<AssetId>,
    oncotree: Option<AssetId>,
    sample_retraction: Option<AssetId>,
    patient_retraction: Option<AssetId>,
    retraction_at_release: Option<AssetId>,
    temporary_patient_retraction: Option<AssetId>,
}

impl AssetOverrides {
    fn resolve(&self, defaults: &AssetOverrides, cohort: &str) -> Result<CohortAssets, ConfigError> {
        let pick = |own: &Option<AssetId>, fallback: &Option<AssetId>, role: &str| {
            own.clone()
                .or_else(|| fallback.clone())
                .ok_or_else(|| ConfigError::MissingAsset {
                    cohort: cohort.to_string(),
                    role: role.to_string(),
                })
        };
        Ok(CohortAssets {
            reference_set: pick(&self.reference_set, &defaults.reference_set, "reference_set")?,
            data_dictionary: pick(
                &self.data_dictionary,
                &defaults.data_dictionary,
                "data_dictionary",
            )?,
            data_tables: pick(&self.data_tables, &defaults.data_tables, "data_tables")?,
            release_snapshot: pick(
                &self.release_snapshot,
                &defaults.release_snapshot,
                "release_snapshot",
            )?,
            prissmm: pick(&self.prissmm, &defaults.prissmm, "prissmm")?,
            assay_panel: pick(&self.assay_panel, &defaults.assay_panel, "assay_panel")?,
            oncotree: pick(&self.oncotree, &defaults.oncotree, "oncotree")?,
            sample_retraction: pick(
                &self.sample_retraction,
                &defaults.sample_retraction,
                "sample_retraction",
            )?,
            patient_retraction: pick(
                &self.patient_retraction,
                &defaults.patient_retraction,
                "patient_retraction",
            )?,
            retraction_at_release: pick(
                &self.retraction_at_release,
                &defaults.retraction_at_release,
                "retraction_at_release",
            )?,
            temporary_patient_retraction: pick(
                &self.temporary_patient_retraction,
                &defaults.temporary_patient_retraction,
                "temporary_patient_retraction",
            )?,
        })
    }
}

/// All configured cohorts plus the release-wide settings.
#[derive(Debug, Clone)]
pub struct CohortRegistry {
    pub release: ReleaseSettings,
    pub cohorts: Vec<CohortConfig>,
}

impl CohortRegistry {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let registry = Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Toml { source, .. } => ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        debug!(path = %path.display(), cohorts = registry.cohorts.len(), "loaded cohort config");
        Ok(registry)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents).map_err(|e| ConfigError::Toml {
            path: PathBuf::new(),
            source: e,
        })?;
        if raw.config.schema != CONFIG_SCHEMA {
            return Err(ConfigError::Invalid {
                message: format!("unsupported schema: {}", raw.config.schema),
            });
        }
        if raw.config.schema_version != 1 {
            return Err(ConfigError::Invalid {
                message: format!("unsupported schema_version: {}", raw.config.schema_version),
            });
        }
        if raw.release.source_definition.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "release.source_definition must not be empty".to_string(),
            });
        }

        let mut cohorts: Vec<CohortConfig> = Vec::with_capacity(raw.cohorts.len());
        for cohort in raw.cohorts {
            let id = cohort.id.trim().to_string();
            if id.is_empty() {
                return Err(ConfigError::Invalid {
                    message: "cohort id must not be empty".to_string(),
                });
            }
            if cohorts.iter().any(|c| c.id.eq_ignore_ascii_case(&id)) {
                return Err(ConfigError::DuplicateCohort { id });
            }
            let assets = cohort.assets.resolve(&raw.assets, &id)?;
            cohorts.push(CohortConfig {
                id,
                assets,
                exclude_files: cohort.exclude_files,
                skip_categories: cohort.skip_categories,
            });
        }
        Ok(Self {
            release: raw.release,
            cohorts,
        })
    }

    /// Look up a cohort by id, ignoring case.
    pub fn cohort(&self, id: &str) -> Result<&CohortConfig, ConfigError> {
        self.cohorts
            .iter()
            .find(|cohort| cohort.id.eq_ignore_ascii_case(id.trim()))
            .ok_or_else(|| ConfigError::UnknownCohort {
                id: id.to_string(),
                known: self.ids().join(", "),
            })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.cohorts.iter().map(|cohort| cohort.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[config]
schema = "bpc-export.cohorts"
schema_version = 1

[release]
source_definition = "https://example.org/bpc-export"

[release.anchor]
dataset = "cancer_index"

[assets]
reference_set = "syn_ref"
data_dictionary = "syn_dd"
data_tables = "syn_tables"
release_snapshot = "syn_release"
prissmm = "syn_prissmm"
assay_panel = "syn_assay"
oncotree = "syn_oncotree"
sample_retraction = "syn_sr"
patient_retraction = "syn_pr"
retraction_at_release = "syn_rr"
temporary_patient_retraction = "syn_tr"

[[cohorts]]
id = "NSCLC"
exclude_files = ["data_timeline_labtest.txt"]
skip_categories = ["TIMELINE-LAB", "TIMELINE-PERFORMANCE"]

[[cohorts]]
id = "CRC"
skip_categories = ["TIMELINE-TREATMENT-RT"]

[cohorts.assets]
release_snapshot = "syn_release_crc"
"#;

    #[test]
    fn cohorts_inherit_and_override_assets() {
        let registry = CohortRegistry::from_toml_str(CONFIG).expect("config");
        assert_eq!(registry.ids(), vec!["NSCLC", "CRC"]);
        let crc = registry.cohort("crc").expect("crc");
        assert_eq!(crc.assets.release_snapshot.as_str(), "syn_release_crc");
        assert_eq!(crc.assets.reference_set.as_str(), "syn_ref");
        let nsclc = registry.cohort("NSCLC").expect("nsclc");
        assert!(nsclc.skips(Category::TimelineLab));
        let anchor = registry.release.anchor.expect("anchor");
        assert_eq!(anchor.field, "dob_ca_dx_days");
    }

    #[test]
    fn missing_asset_is_reported_with_role() {
        let config = CONFIG.replace("prissmm = \"syn_prissmm\"\n", "");
        let err = CohortRegistry::from_toml_str(&config).expect_err("missing asset");
        assert!(
            matches!(err, ConfigError::MissingAsset { ref role, .. } if role == "prissmm"),
            "{err}"
        );
    }

    #[test]
    fn unknown_cohort_lists_configured_ids() {
        let registry = CohortRegistry::from_toml_str(CONFIG).expect("config");
        let err = registry.cohort("MELANOMA").expect_err("unknown");
        assert_eq!(
            err.to_string(),
            "unknown cohort MELANOMA (configured: NSCLC, CRC)"
        );
    }

    #[test]
    fn duplicate_cohorts_are_rejected() {
        let config = format!("{CONFIG}\n[[cohorts]]\nid = \"nsclc\"\n");
        let err = CohortRegistry::from_toml_str(&config).expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateCohort { .. }));
    }

    #[test]
    fn unknown_skip_category_fails_to_parse() {
        let config = CONFIG.replace("TIMELINE-TREATMENT-RT", "TIMELINE-BOGUS");
        assert!(CohortRegistry::from_toml_str(&config).is_err());
    }
}
