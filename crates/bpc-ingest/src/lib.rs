//! Asset ingestion for the BPC exporter.
//!
//! Fetches registry tables through an [`AssetStore`], loads the cohort
//! configuration, and provides the polars helpers the later stages use.

pub mod config;
pub mod csv_table;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod polars_utils;
pub mod store;

pub use config::{CONFIG_ENV_VAR, CohortRegistry, config_path};
pub use csv_table::{CsvTable, read_delimited};
pub use error::{AssetError, ConfigError};
pub use hash::sha256_hex;
pub use manifest::{AssetManifest, ManifestAsset, TableFormat};
pub use polars_utils::{
    any_to_string, column_names, column_value, format_numeric, frame_records, parse_f64,
    records_to_frame, string_column, table_to_frame,
};
pub use store::{ASSETS_ENV_VAR, AssetStore, LocalAssetStore, MemoryAssetStore, assets_root};
