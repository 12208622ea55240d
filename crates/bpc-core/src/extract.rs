//! Per-category extraction.
//!
//! [`Extractor::extract`] gathers everything one category transform needs:
//! the mapping catalog, the raw tables of the datasets the category's mapping
//! rows reference (restricted to the cohort and joined with their derived
//! variable sets), the retraction union, and the release tables sample-level
//! categories join against. Every asset read is recorded for provenance.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span};

use bpc_ingest::{AssetStore, CsvTable, parse_f64, records_to_frame};
use bpc_map::{DrugCodeMapper, MappingCatalog, OncotreeReference};
use bpc_model::{
    AnchorConfig, AssetId, COHORT_KEY, Category, CohortConfig, ONCOTREE_CODE, PATIENT_ID,
    PATIENT_KEY, SAMPLE_ID, SAMPLE_KEY, SEQ_ASSAY_ID,
};

use crate::retraction::{ExcludedIds, RetractionFilter};

const DATASET_COLUMN: &[&str] = &["dataset", "name", "table"];
const ASSET_COLUMN: &[&str] = &["asset_id", "id", "synapse_id"];
const KIND_COLUMN: &[&str] = &["kind", "type"];

/// Options shared by every extraction of a run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Read the reference set rather than the data dictionary.
    pub use_reference_set: bool,
    /// Release the retraction-at-release list is scoped to.
    pub release: String,
    /// Derived dataset holding each patient's index day.
    pub anchor: Option<AnchorConfig>,
}

/// One raw dataset, restricted to the cohort and joined with derived variables.
#[derive(Debug, Clone)]
pub struct DatasetFrame {
    pub dataset: String,
    pub data: DataFrame,
}

/// A sample row of the main release snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSample {
    pub sample_id: String,
    pub patient_id: String,
    pub seq_assay_id: String,
    pub oncotree_code: String,
}

/// Everything a category transform consumes.
#[derive(Debug, Clone)]
pub struct ExtractBundle {
    pub cohort: String,
    pub category: Category,
    pub catalog: MappingCatalog,
    pub drug_codes: DrugCodeMapper,
    pub datasets: Vec<DatasetFrame>,
    /// Index day per patient; None when no anchor dataset is configured.
    pub anchors: Option<BTreeMap<String, f64>>,
    pub excluded: ExcludedIds,
    /// Release snapshot samples keyed by SAMPLE_ID.
    pub release_samples: Option<BTreeMap<String, ReleaseSample>>,
    /// Assay panel attributes keyed by SEQ_ASSAY_ID.
    pub assay_panels: Option<BTreeMap<String, BTreeMap<String, String>>>,
    pub oncotree: Option<OncotreeReference>,
    /// PRISSMM summary, read with the treatment timeline only.
    pub prissmm: Option<CsvTable>,
    /// Assets consumed, in fetch order without duplicates.
    pub used: Vec<AssetId>,
    /// Mapping and PRISSMM assets the clinical header metadata comes from.
    pub metadata_assets: Vec<AssetId>,
}

impl ExtractBundle {
    /// Total rows across all dataset frames.
    pub fn record_count(&self) -> usize {
        self.datasets.iter().map(|frame| frame.data.height()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatasetKind {
    Raw,
    Derived,
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    dataset: String,
    asset: AssetId,
    kind: DatasetKind,
}

/// Rows of one fetched table, kept as maps for joining.
struct LoadedTable {
    dataset: String,
    columns: Vec<String>,
    records: Vec<BTreeMap<String, String>>,
}

pub struct Extractor<'a> {
    store: &'a dyn AssetStore,
    options: ExtractOptions,
}

impl<'a> Extractor<'a> {
    pub fn new(store: &'a dyn AssetStore, options: ExtractOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract the inputs of one category for one cohort.
    ///
    /// Any asset that cannot be fetched aborts the extraction.
    pub fn extract(&self, cohort: &CohortConfig, category: Category) -> Result<ExtractBundle> {
        let span = info_span!("extract", cohort = %cohort.id, category = %category);
        let _guard = span.enter();
        let start = Instant::now();
        let spec = category.spec();
        let mut used = UsedAssets::default();

        let catalog = MappingCatalog::load(self.store, cohort, self.options.use_reference_set)
            .with_context(|| format!("load mapping catalog for {}", cohort.id))?;
        used.push(cohort.assets.mapping(self.options.use_reference_set));
        let drug_codes = DrugCodeMapper::from_catalog(&catalog);

        let registry = self.read(&cohort.assets.data_tables, &mut used)?;
        let registry = parse_registry(&registry, &cohort.assets.data_tables)?;

        let mut raw_tables = Vec::new();
        let mut derived_tables = Vec::new();
        for dataset in catalog.datasets_for_category(category) {
            let Some(entry) = registry
                .iter()
                .find(|entry| entry.dataset.eq_ignore_ascii_case(&dataset))
            else {
                bail!(
                    "dataset {dataset} used by {category} is not in data table registry {}",
                    cohort.assets.data_tables
                );
            };
            let table = self.read(&entry.asset, &mut used)?;
            let loaded = load_cohort_rows(&entry.dataset, &table, &cohort.id);
            match entry.kind {
                DatasetKind::Raw => raw_tables.push(loaded),
                DatasetKind::Derived => derived_tables.push(loaded),
            }
        }

        let datasets = if raw_tables.is_empty() {
            derived_tables
                .into_iter()
                .map(into_frame)
                .collect::<Result<Vec<_>>>()?
        } else {
            raw_tables
                .into_iter()
                .map(|table| into_frame(join_derived(table, &derived_tables)))
                .collect::<Result<Vec<_>>>()?
        };

        let anchors = match (&self.options.anchor, category.is_timeline()) {
            (Some(anchor), true) => Some(self.read_anchors(anchor, &registry, cohort, &mut used)?),
            _ => None,
        };

        let excluded = RetractionFilter::new(self.store)
            .excluded_ids(cohort, &self.options.release)
            .with_context(|| format!("compute retraction union for {}", cohort.id))?;
        for asset in cohort.assets.retraction_lists() {
            used.push(asset);
        }

        let release_samples = if spec.joins_release {
            let table = self.read(&cohort.assets.release_snapshot, &mut used)?;
            Some(parse_release_samples(&table, &cohort.assets.release_snapshot)?)
        } else {
            None
        };
        let assay_panels = if spec.joins_assay {
            let table = self.read(&cohort.assets.assay_panel, &mut used)?;
            Some(parse_assay_panels(&table, &cohort.assets.assay_panel)?)
        } else {
            None
        };
        let oncotree = if category == Category::Sample {
            let table = self.read(&cohort.assets.oncotree, &mut used)?;
            Some(OncotreeReference::from_table(&table, &cohort.assets.oncotree)?)
        } else {
            None
        };
        let mut metadata_assets = vec![
            cohort
                .assets
                .mapping(self.options.use_reference_set)
                .clone(),
        ];
        let prissmm = if category == Category::TimelineTreatment {
            let table = self.read(&cohort.assets.prissmm, &mut used)?;
            metadata_assets.push(cohort.assets.prissmm.clone());
            Some(table)
        } else {
            None
        };

        let bundle = ExtractBundle {
            cohort: cohort.id.clone(),
            category,
            catalog,
            drug_codes,
            datasets,
            anchors,
            excluded,
            release_samples,
            assay_panels,
            oncotree,
            prissmm,
            used: used.into_inner(),
            metadata_assets,
        };
        info!(
            record_count = bundle.record_count(),
            excluded_count = bundle.excluded.len(),
            asset_count = bundle.used.len(),
            duration_ms = start.elapsed().as_millis(),
            "extraction complete"
        );
        Ok(bundle)
    }

    fn read(&self, asset: &AssetId, used: &mut UsedAssets) -> Result<CsvTable> {
        let table = self
            .store
            .read_table(asset)
            .with_context(|| format!("fetch asset {asset}"))?;
        used.push(asset);
        Ok(table)
    }

    fn read_anchors(
        &self,
        anchor: &AnchorConfig,
        registry: &[RegistryEntry],
        cohort: &CohortConfig,
        used: &mut UsedAssets,
    ) -> Result<BTreeMap<String, f64>> {
        let Some(entry) = registry
            .iter()
            .find(|entry| entry.dataset.eq_ignore_ascii_case(&anchor.dataset))
        else {
            bail!(
                "anchor dataset {} is not in data table registry {}",
                anchor.dataset,
                cohort.assets.data_tables
            );
        };
        let table = self.read(&entry.asset, used)?;
        let loaded = load_cohort_rows(&entry.dataset, &table, &cohort.id);
        let mut anchors = BTreeMap::new();
        for record in &loaded.records {
            let Some(patient) = record.get(PATIENT_KEY).map(|v| v.trim()) else {
                continue;
            };
            let Some(day) = record.get(&anchor.field).and_then(|v| parse_f64(v)) else {
                continue;
            };
            if !patient.is_empty() {
                anchors.entry(patient.to_string()).or_insert(day);
            }
        }
        debug!(dataset = %anchor.dataset, patients = anchors.len(), "read index days");
        Ok(anchors)
    }
}

#[derive(Default)]
struct UsedAssets {
    ids: Vec<AssetId>,
}

impl UsedAssets {
    fn push(&mut self, id: &AssetId) {
        if !self.ids.contains(id) {
            self.ids.push(id.clone());
        }
    }

    fn into_inner(self) -> Vec<AssetId> {
        self.ids
    }
}

fn parse_registry(table: &CsvTable, asset: &AssetId) -> Result<Vec<RegistryEntry>> {
    let (Some(dataset_idx), Some(asset_idx)) = (
        table.column_index(DATASET_COLUMN),
        table.column_index(ASSET_COLUMN),
    ) else {
        bail!("data table registry {asset} needs dataset and asset_id columns");
    };
    let kind_idx = table.column_index(KIND_COLUMN);
    let mut entries = Vec::with_capacity(table.len());
    for row in &table.rows {
        let dataset = row[dataset_idx].trim();
        if dataset.is_empty() {
            continue;
        }
        let id = AssetId::new(row[asset_idx].as_str())
            .with_context(|| format!("registry {asset} entry {dataset}"))?;
        let kind = match CsvTable::cell(row, kind_idx).to_ascii_lowercase().as_str() {
            "" | "raw" => DatasetKind::Raw,
            "derived" => DatasetKind::Derived,
            other => bail!("registry {asset} entry {dataset} has unknown kind {other}"),
        };
        entries.push(RegistryEntry {
            dataset: dataset.to_string(),
            asset: id,
            kind,
        });
    }
    Ok(entries)
}

/// Rows of a table that belong to the cohort (all rows when there is no cohort column).
fn load_cohort_rows(dataset: &str, table: &CsvTable, cohort: &str) -> LoadedTable {
    let cohort_idx = table.column_index(&[COHORT_KEY]);
    let records = table
        .rows
        .iter()
        .filter(|row| match cohort_idx {
            Some(idx) => row[idx].trim().eq_ignore_ascii_case(cohort),
            None => true,
        })
        .map(|row| {
            table
                .headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
        .collect();
    LoadedTable {
        dataset: dataset.to_string(),
        columns: table.headers.clone(),
        records,
    }
}

/// Join key of a record: patient id plus sample id when both sides carry one.
fn join_key(record: &BTreeMap<String, String>, with_sample: bool) -> Option<(String, String)> {
    let patient = record.get(PATIENT_KEY)?.trim();
    if patient.is_empty() {
        return None;
    }
    let sample = if with_sample {
        record.get(SAMPLE_KEY).map(|s| s.trim().to_string()).unwrap_or_default()
    } else {
        String::new()
    };
    Some((patient.to_string(), sample))
}

/// Left-join derived variable sets into a raw table.
///
/// Only columns the raw table lacks are added; the first derived row per key wins.
fn join_derived(mut base: LoadedTable, derived: &[LoadedTable]) -> LoadedTable {
    for table in derived {
        let with_sample = base.columns.iter().any(|c| c == SAMPLE_KEY)
            && table.columns.iter().any(|c| c == SAMPLE_KEY);
        let mut by_key: BTreeMap<(String, String), &BTreeMap<String, String>> = BTreeMap::new();
        for record in &table.records {
            if let Some(key) = join_key(record, with_sample) {
                by_key.entry(key).or_insert(record);
            }
        }
        let added: Vec<String> = table
            .columns
            .iter()
            .filter(|column| !base.columns.contains(column))
            .cloned()
            .collect();
        for record in &mut base.records {
            let matched = join_key(record, with_sample).and_then(|key| by_key.get(&key).copied());
            for column in &added {
                let value = matched
                    .and_then(|m| m.get(column))
                    .cloned()
                    .unwrap_or_default();
                record.insert(column.clone(), value);
            }
        }
        debug!(base = %base.dataset, derived = %table.dataset, columns = added.len(), "joined derived variables");
        base.columns.extend(added);
    }
    base
}

fn into_frame(table: LoadedTable) -> Result<DatasetFrame> {
    let data = records_to_frame(&table.columns, &table.records)
        .with_context(|| format!("build frame for dataset {}", table.dataset))?;
    Ok(DatasetFrame {
        dataset: table.dataset,
        data,
    })
}

fn parse_release_samples(
    table: &CsvTable,
    asset: &AssetId,
) -> Result<BTreeMap<String, ReleaseSample>> {
    let Some(sample_idx) = table.column_index(&[SAMPLE_ID]) else {
        bail!("release snapshot {asset} has no {SAMPLE_ID} column");
    };
    let patient_idx = table.column_index(&[PATIENT_ID]);
    let assay_idx = table.column_index(&[SEQ_ASSAY_ID]);
    let oncotree_idx = table.column_index(&[ONCOTREE_CODE]);
    let mut samples = BTreeMap::new();
    for row in &table.rows {
        let sample_id = row[sample_idx].trim();
        if sample_id.is_empty() {
            continue;
        }
        samples
            .entry(sample_id.to_string())
            .or_insert_with(|| ReleaseSample {
                sample_id: sample_id.to_string(),
                patient_id: CsvTable::cell(row, patient_idx).to_string(),
                seq_assay_id: CsvTable::cell(row, assay_idx).to_string(),
                oncotree_code: CsvTable::cell(row, oncotree_idx).to_string(),
            });
    }
    Ok(samples)
}

fn parse_assay_panels(
    table: &CsvTable,
    asset: &AssetId,
) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
    let Some(assay_idx) = table.column_index(&[SEQ_ASSAY_ID]) else {
        bail!("assay panel table {asset} has no {SEQ_ASSAY_ID} column");
    };
    let mut panels = BTreeMap::new();
    for row in &table.rows {
        let assay = row[assay_idx].trim();
        if assay.is_empty() {
            continue;
        }
        let attributes: BTreeMap<String, String> = table
            .headers
            .iter()
            .zip(row.iter())
            .enumerate()
            .filter(|(idx, _)| *idx != assay_idx)
            .map(|(_, (header, value))| (header.to_ascii_uppercase(), value.clone()))
            .collect();
        panels.entry(assay.to_string()).or_insert(attributes);
    }
    Ok(panels)
}
