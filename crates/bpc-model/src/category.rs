//! Output categories and their per-category rules.
//!
//! Every file the exporter can produce is one [`Category`]. The behavior that
//! differs between categories (timeline or clinical layout, the event type,
//! whether the start-date filter applies, which release tables are joined)
//! is carried as data in [`CategorySpec`] so the transform and orchestration
//! layers never branch on category names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Whether a category is written as a timeline or as a clinical attribute file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    Timeline,
    Clinical,
}

/// Row granularity of a category's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordLevel {
    Patient,
    Sample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    TimelineTreatment,
    TimelinePerformance,
    TimelineTreatmentRt,
    TimelineDx,
    TimelineImaging,
    TimelineMedonc,
    TimelinePathology,
    TimelineSample,
    TimelineSequence,
    TimelineLab,
    Survival,
    Regimen,
    Sample,
    Patient,
}

/// Static rules attached to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: &'static str,
    pub kind: CategoryKind,
    pub level: RecordLevel,
    /// Default EVENT_TYPE for timeline rows when the mapping provides none.
    pub event_type: Option<&'static str>,
    /// Fixed TREATMENT_TYPE for treatment timelines.
    pub treatment_type: Option<&'static str>,
    /// The diagnosis timeline keeps rows without a start date.
    pub start_filter_exempt: bool,
    /// Restrict rows to samples present in the release snapshot.
    pub joins_release: bool,
    /// Join assay panel attributes on SEQ_ASSAY_ID.
    pub joins_assay: bool,
    /// Derive AGENT / REGIMEN_DRUGS from the drug slots.
    pub derives_agents: bool,
    /// Historical cBioPortal file name, accepted in exclusion lists.
    pub legacy_file: &'static str,
}

impl Category {
    /// Every category in processing order. The treatment timeline is first.
    pub const ALL: [Category; 14] = [
        Category::TimelineTreatment,
        Category::TimelinePerformance,
        Category::TimelineTreatmentRt,
        Category::TimelineDx,
        Category::TimelineImaging,
        Category::TimelineMedonc,
        Category::TimelinePathology,
        Category::TimelineSample,
        Category::TimelineSequence,
        Category::TimelineLab,
        Category::Survival,
        Category::Regimen,
        Category::Sample,
        Category::Patient,
    ];

    pub fn spec(self) -> CategorySpec {
        let timeline = CategorySpec {
            name: "",
            kind: CategoryKind::Timeline,
            level: RecordLevel::Patient,
            event_type: None,
            treatment_type: None,
            start_filter_exempt: false,
            joins_release: false,
            joins_assay: false,
            derives_agents: false,
            legacy_file: "",
        };
        let clinical = CategorySpec {
            kind: CategoryKind::Clinical,
            ..timeline
        };
        match self {
            Category::TimelineTreatment => CategorySpec {
                name: "TIMELINE-TREATMENT",
                event_type: Some("TREATMENT"),
                treatment_type: Some("Systemic Therapy"),
                derives_agents: true,
                legacy_file: "data_timeline_treatment.txt",
                ..timeline
            },
            Category::TimelinePerformance => CategorySpec {
                name: "TIMELINE-PERFORMANCE",
                event_type: Some("PERFORMANCE_STATUS"),
                legacy_file: "data_timeline_performance_status.txt",
                ..timeline
            },
            Category::TimelineTreatmentRt => CategorySpec {
                name: "TIMELINE-TREATMENT-RT",
                event_type: Some("TREATMENT"),
                treatment_type: Some("Radiation Therapy"),
                legacy_file: "data_timeline_treatment_rt.txt",
                ..timeline
            },
            Category::TimelineDx => CategorySpec {
                name: "TIMELINE-DX",
                event_type: Some("DIAGNOSIS"),
                start_filter_exempt: true,
                legacy_file: "data_timeline_cancer_diagnosis.txt",
                ..timeline
            },
            Category::TimelineImaging => CategorySpec {
                name: "TIMELINE-IMAGING",
                event_type: Some("IMAGING"),
                legacy_file: "data_timeline_imaging.txt",
                ..timeline
            },
            Category::TimelineMedonc => CategorySpec {
                name: "TIMELINE-MEDONC",
                event_type: Some("MED_ONC_ASSESSMENT"),
                legacy_file: "data_timeline_medonc.txt",
                ..timeline
            },
            Category::TimelinePathology => CategorySpec {
                name: "TIMELINE-PATHOLOGY",
                event_type: Some("PATHOLOGY"),
                legacy_file: "data_timeline_pathology.txt",
                ..timeline
            },
            Category::TimelineSample => CategorySpec {
                name: "TIMELINE-SAMPLE",
                level: RecordLevel::Sample,
                event_type: Some("SPECIMEN"),
                joins_release: true,
                legacy_file: "data_timeline_sample_acquisition.txt",
                ..timeline
            },
            Category::TimelineSequence => CategorySpec {
                name: "TIMELINE-SEQUENCE",
                level: RecordLevel::Sample,
                event_type: Some("SEQUENCING"),
                joins_release: true,
                joins_assay: true,
                legacy_file: "data_timeline_sequencing.txt",
                ..timeline
            },
            Category::TimelineLab => CategorySpec {
                name: "TIMELINE-LAB",
                event_type: Some("LAB_TEST"),
                legacy_file: "data_timeline_labtest.txt",
                ..timeline
            },
            Category::Survival => CategorySpec {
                name: "SURVIVAL",
                legacy_file: "data_clinical_supp_survival.txt",
                ..clinical
            },
            Category::Regimen => CategorySpec {
                name: "REGIMEN",
                derives_agents: true,
                legacy_file: "data_clinical_supp_survival_treatment.txt",
                ..clinical
            },
            Category::Sample => CategorySpec {
                name: "SAMPLE",
                level: RecordLevel::Sample,
                joins_release: true,
                legacy_file: "data_clinical_sample.txt",
                ..clinical
            },
            Category::Patient => CategorySpec {
                name: "PATIENT",
                legacy_file: "data_clinical_patient.txt",
                ..clinical
            },
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn kind(self) -> CategoryKind {
        self.spec().kind
    }

    pub fn is_timeline(self) -> bool {
        self.kind() == CategoryKind::Timeline
    }

    /// Output file name, `{CATEGORY}.txt`.
    pub fn file_name(self) -> String {
        format!("{}.txt", self.name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ModelError::UnknownCategory {
                name: wanted.to_string(),
            })
    }
}

impl TryFrom<String> for Category {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.name().to_string()
    }
}
