use std::path::PathBuf;

use bpc_model::Category;

/// What happened to one category during a cohort run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStatus {
    Written,
    /// Produced but not persisted because of `--dry-run`.
    DryRun,
    /// Appended to another category's output instead of its own file.
    Composed,
    /// The registry never populates this category for the cohort.
    Skipped,
    /// The cohort's exclusion list names this output file.
    Excluded,
}

impl CategoryStatus {
    pub fn label(self) -> &'static str {
        match self {
            CategoryStatus::Written => "written",
            CategoryStatus::DryRun => "dry run",
            CategoryStatus::Composed => "appended",
            CategoryStatus::Skipped => "skipped",
            CategoryStatus::Excluded => "excluded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub status: CategoryStatus,
    pub records: Option<usize>,
    pub path: Option<PathBuf>,
}

impl CategorySummary {
    pub fn not_produced(category: Category, status: CategoryStatus) -> Self {
        Self {
            category,
            status,
            records: None,
            path: None,
        }
    }
}

/// Result of exporting one cohort.
#[derive(Debug, Clone)]
pub struct CohortRun {
    pub cohort: String,
    pub release: String,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    /// One entry per category; the treatment timeline comes first.
    pub categories: Vec<CategorySummary>,
}

impl CohortRun {
    pub fn summary(&self, category: Category) -> Option<&CategorySummary> {
        self.categories
            .iter()
            .find(|summary| summary.category == category)
    }

    /// Records across every persisted (or would-be persisted) file.
    pub fn total_records(&self) -> usize {
        self.categories
            .iter()
            .filter(|summary| {
                matches!(
                    summary.status,
                    CategoryStatus::Written | CategoryStatus::DryRun
                )
            })
            .filter_map(|summary| summary.records)
            .sum()
    }
}
