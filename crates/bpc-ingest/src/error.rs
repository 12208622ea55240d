#![deny(unsafe_code)]

use std::path::PathBuf;

use bpc_model::AssetId;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML manifest {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid asset manifest: {message}")]
    InvalidManifest { message: String },

    #[error("asset {id} is not listed in the asset manifest")]
    UnknownAsset { id: AssetId },

    #[error("missing file for asset {id}: {path}")]
    MissingFile { id: AssetId, path: PathBuf },

    #[error("sha256 mismatch for {path} (expected {expected}, got {actual})")]
    Sha256Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to parse table {path}: {message}")]
    Csv { path: PathBuf, message: String },
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid cohort config: {message}")]
    Invalid { message: String },

    #[error("cohort {cohort} has no asset configured for {role}")]
    MissingAsset { cohort: String, role: String },

    #[error("duplicate cohort in config: {id}")]
    DuplicateCohort { id: String },

    #[error("unknown cohort {id} (configured: {known})")]
    UnknownCohort { id: String, known: String },
}
