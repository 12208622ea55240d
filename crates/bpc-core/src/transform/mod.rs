//! Category transforms.
//!
//! Each output category is produced by one [`CategoryTransform`]. The
//! transforms share the same steps (field mapping, retraction exclusion,
//! category derivations, optional start-date filter) and differ only in their
//! derivations, so most of them are thin wrappers over the timeline and
//! clinical builders.
//!
//! # Example
//!
//! ```ignore
//! use bpc_core::transform::create_output;
//!
//! let bundle = extractor.extract(cohort, Category::TimelineImaging)?;
//! let table = create_output(&bundle, true)?;
//! ```

mod clinical;
mod common;
mod timeline;

use std::time::Instant;

use anyhow::Result;
use tracing::{info, info_span};

use bpc_model::Category;

use crate::extract::ExtractBundle;
use crate::frame::TargetTable;

pub use clinical::{PatientClinical, RegimenClinical, SampleClinical, SurvivalClinical};
pub use timeline::{
    DiagnosisTimeline, EventTimeline, PerformanceTimeline, SampleTimeline, TreatmentTimeline,
};

/// Turns one category's extraction into its output table.
pub trait CategoryTransform: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "Category transform"
    }

    /// Build the output table for the bundle's category.
    ///
    /// `filter_start` drops rows whose START_DATE is undefined; transforms
    /// for categories exempt from the filter ignore it.
    ///
    /// # Errors
    ///
    /// Returns an error if a dataset frame cannot be read or the output frame
    /// cannot be built.
    fn create_output(&self, bundle: &ExtractBundle, filter_start: bool) -> Result<TargetTable>;
}

/// The transform responsible for a category.
pub fn transform_for(category: Category) -> &'static dyn CategoryTransform {
    match category {
        Category::TimelineTreatment => &TreatmentTimeline,
        Category::TimelinePerformance => &PerformanceTimeline,
        Category::TimelineDx => &DiagnosisTimeline,
        Category::TimelineSample | Category::TimelineSequence => &SampleTimeline,
        Category::TimelineTreatmentRt
        | Category::TimelineImaging
        | Category::TimelineMedonc
        | Category::TimelinePathology
        | Category::TimelineLab => &EventTimeline,
        Category::Survival => &SurvivalClinical,
        Category::Regimen => &RegimenClinical,
        Category::Sample => &SampleClinical,
        Category::Patient => &PatientClinical,
    }
}

/// Run the transform of the bundle's category.
pub fn create_output(bundle: &ExtractBundle, filter_start: bool) -> Result<TargetTable> {
    let transform = transform_for(bundle.category);
    let span = info_span!(
        "transform",
        cohort = %bundle.cohort,
        category = %bundle.category,
        transform = transform.name(),
        description = transform.description()
    );
    let _guard = span.enter();
    let start = Instant::now();
    let table = transform.create_output(bundle, filter_start)?;
    info!(
        record_count = table.record_count(),
        excluded_count = bundle.excluded.len(),
        filter_start,
        duration_ms = start.elapsed().as_millis(),
        "transform complete"
    );
    Ok(table)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_transform() {
        for category in Category::ALL {
            assert!(!transform_for(category).name().is_empty());
        }
        assert_eq!(transform_for(Category::TimelineDx).name(), "diagnosis-timeline");
        assert_eq!(transform_for(Category::TimelineSequence).name(), "sample-timeline");
    }

    #[test]
    fn joined_outputs_describe_their_sources() {
        assert!(
            transform_for(Category::Sample)
                .description()
                .contains("oncotree")
        );
        assert!(
            transform_for(Category::TimelineTreatment)
                .description()
                .contains("AGENT_CODE")
        );
        assert_eq!(
            transform_for(Category::TimelineDx).description(),
            "Category transform"
        );
    }
}
