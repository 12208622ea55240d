//! Command-line orchestration for the cBioPortal export.

pub mod logging;
pub mod runner;
pub mod types;

pub use runner::{RunOptions, run_cohort};
