//! Extraction and transformation of BPC registry data into cBioPortal tables.
//!
//! A category is produced in two steps: [`Extractor::extract`] fetches and
//! joins the source tables into an [`ExtractBundle`], then
//! [`transform::create_output`] maps it to a [`TargetTable`]. The
//! [`compose`] functions combine or annotate outputs before persistence.

#![deny(unsafe_code)]

pub mod compose;
pub mod extract;
pub mod frame;
pub mod retraction;
pub mod survival;
pub mod transform;

pub use compose::{append_radiation, attach_clinical_header};
pub use extract::{DatasetFrame, ExtractBundle, ExtractOptions, Extractor, ReleaseSample};
pub use frame::TargetTable;
pub use retraction::{ExcludedIds, RetractionFilter};
pub use survival::SurvivalSummary;
pub use transform::{CategoryTransform, create_output, transform_for};
