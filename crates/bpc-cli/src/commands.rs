use anyhow::{Context, Result, anyhow};
use comfy_table::Table;

use bpc_cli::runner::{RunOptions, run_cohort};
use bpc_cli::types::CohortRun;
use bpc_ingest::{ASSETS_ENV_VAR, CohortRegistry, LocalAssetStore, assets_root, config_path};
use bpc_model::Category;

use crate::cli::{CohortsArgs, RunArgs};
use crate::summary::{apply_table_style, dim_cell, header_cell, name_cell};

pub fn run_export(args: &RunArgs) -> Result<CohortRun> {
    let path = config_path(args.config.as_deref());
    let registry = CohortRegistry::load(&path)
        .with_context(|| format!("load cohort config {}", path.display()))?;
    let cohort = registry.cohort(&args.cohort)?;

    let root = assets_root(args.assets.as_deref()).ok_or_else(|| {
        anyhow!("no asset directory: pass --assets or set {ASSETS_ENV_VAR}")
    })?;
    let store = LocalAssetStore::open(&root)
        .with_context(|| format!("open asset directory {}", root.display()))?;

    let options = RunOptions {
        release: args.release.trim().to_string(),
        output_dir: args.output_dir.clone(),
        use_data_dictionary: args.use_data_dictionary,
        dry_run: args.dry_run,
    };
    run_cohort(&store, &registry.release, cohort, &options)
        .with_context(|| format!("export cohort {}", cohort.id))
}

pub fn run_cohorts(args: &CohortsArgs) -> Result<()> {
    let path = config_path(args.config.as_deref());
    let registry = CohortRegistry::load(&path)
        .with_context(|| format!("load cohort config {}", path.display()))?;

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Cohort"),
        header_cell("Outputs"),
        header_cell("Skipped categories"),
        header_cell("Excluded files"),
    ]);
    apply_table_style(&mut table);
    for cohort in &registry.cohorts {
        let skipped = cohort
            .skip_categories
            .iter()
            .copied()
            .map(Category::name)
            .collect::<Vec<_>>();
        let outputs = Category::ALL
            .into_iter()
            .filter(|category| cohort.produces(*category))
            .count();
        table.add_row(vec![
            name_cell(&cohort.id),
            comfy_table::Cell::new(format!("{outputs}/{}", Category::ALL.len())),
            list_cell(&skipped),
            list_cell(&cohort.exclude_files),
        ]);
    }
    println!("Config: {}", path.display());
    println!("Source definition: {}", registry.release.source_definition);
    println!("{table}");
    Ok(())
}

fn list_cell<S: AsRef<str>>(values: &[S]) -> comfy_table::Cell {
    if values.is_empty() {
        dim_cell("-")
    } else {
        comfy_table::Cell::new(
            values
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}
