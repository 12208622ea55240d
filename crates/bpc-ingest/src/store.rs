//! Asset stores: where registry tables and lists are fetched from.
//!
//! [`LocalAssetStore`] resolves asset ids through a `manifest.toml` in the
//! asset directory and verifies recorded checksums on every read.
//! [`MemoryAssetStore`] holds tables in memory.

#![deny(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use bpc_model::AssetId;

use crate::csv_table::{CsvTable, read_delimited};
use crate::error::AssetError;
use crate::hash::{is_valid_sha256, sha256_hex};
use crate::manifest::{
    AssetManifest, MANIFEST_FILE, MANIFEST_SCHEMA, MANIFEST_SCHEMA_VERSION, ManifestAsset,
};

/// Environment variable for overriding the asset directory.
pub const ASSETS_ENV_VAR: &str = "BPC_ASSETS_DIR";

/// Resolve the asset directory: explicit path first, then `BPC_ASSETS_DIR`.
pub fn assets_root(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    std::env::var(ASSETS_ENV_VAR).ok().map(PathBuf::from)
}

/// Source of external tabular assets.
///
/// Every read is a fresh fetch; callers that need a table twice read it twice.
pub trait AssetStore {
    /// Fetch one asset as a table.
    fn read_table(&self, id: &AssetId) -> Result<CsvTable, AssetError>;

    /// Recorded content checksum of an asset, when the store knows one.
    fn checksum(&self, id: &AssetId) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    assets: BTreeMap<AssetId, ManifestAsset>,
}

impl LocalAssetStore {
    /// Open an asset directory and validate its manifest.
    pub fn open(root: &Path) -> Result<Self, AssetError> {
        let manifest = load_manifest(&root.join(MANIFEST_FILE))?;
        validate_manifest(&manifest)?;
        let assets = manifest
            .assets
            .into_iter()
            .map(|asset| (asset.id.clone(), asset))
            .collect::<BTreeMap<_, _>>();
        debug!(root = %root.display(), asset_count = assets.len(), "opened asset store");
        Ok(Self {
            root: root.to_path_buf(),
            assets,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ids(&self) -> impl Iterator<Item = &AssetId> {
        self.assets.keys()
    }

    fn entry(&self, id: &AssetId) -> Result<&ManifestAsset, AssetError> {
        self.assets
            .get(id)
            .ok_or_else(|| AssetError::UnknownAsset { id: id.clone() })
    }

    fn verify(&self, asset: &ManifestAsset, path: &Path) -> Result<(), AssetError> {
        let Some(expected) = asset.sha256.as_deref() else {
            return Ok(());
        };
        let bytes = std::fs::read(path).map_err(|e| AssetError::io(path, e))?;
        let actual = sha256_hex(&bytes);
        let expected = expected.to_ascii_lowercase();
        if actual != expected {
            return Err(AssetError::Sha256Mismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl AssetStore for LocalAssetStore {
    fn read_table(&self, id: &AssetId) -> Result<CsvTable, AssetError> {
        let asset = self.entry(id)?;
        let path = self.root.join(&asset.path);
        if !path.is_file() {
            return Err(AssetError::MissingFile {
                id: id.clone(),
                path,
            });
        }
        self.verify(asset, &path)?;
        let table = read_delimited(&path, asset.kind.delimiter())?;
        debug!(asset = %id, rows = table.len(), columns = table.headers.len(), "fetched asset");
        Ok(table)
    }

    fn checksum(&self, id: &AssetId) -> Option<String> {
        self.assets
            .get(id)
            .and_then(|asset| asset.sha256.as_ref())
            .map(|sha| sha.to_ascii_lowercase())
    }
}

fn load_manifest(path: &Path) -> Result<AssetManifest, AssetError> {
    let contents = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| AssetError::Toml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate_manifest(manifest: &AssetManifest) -> Result<(), AssetError> {
    if manifest.manifest.schema != MANIFEST_SCHEMA {
        return Err(AssetError::InvalidManifest {
            message: format!("unsupported schema: {}", manifest.manifest.schema),
        });
    }
    if manifest.manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(AssetError::InvalidManifest {
            message: format!(
                "unsupported schema_version: {}",
                manifest.manifest.schema_version
            ),
        });
    }

    let mut seen: BTreeSet<&AssetId> = BTreeSet::new();
    for asset in &manifest.assets {
        if !seen.insert(&asset.id) {
            return Err(AssetError::InvalidManifest {
                message: format!("duplicate asset id: {}", asset.id),
            });
        }
        validate_path(&asset.path)?;
        if let Some(sha) = &asset.sha256 {
            if !is_valid_sha256(sha) {
                return Err(AssetError::InvalidManifest {
                    message: format!("invalid sha256 for {}: {sha}", asset.id),
                });
            }
        }
    }
    Ok(())
}

fn validate_path(raw: &str) -> Result<(), AssetError> {
    let path = Path::new(raw);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if raw.trim().is_empty() || escapes {
        return Err(AssetError::InvalidManifest {
            message: format!("asset path must be relative to the asset directory: {raw}"),
        });
    }
    Ok(())
}

/// In-memory asset store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    tables: BTreeMap<AssetId, CsvTable>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &AssetId, table: CsvTable) {
        self.tables.insert(id.clone(), table);
    }

    #[must_use]
    pub fn with_table(mut self, id: &AssetId, table: CsvTable) -> Self {
        self.insert(id, table);
        self
    }

    pub fn remove(&mut self, id: &AssetId) -> Option<CsvTable> {
        self.tables.remove(id)
    }
}

impl AssetStore for MemoryAssetStore {
    fn read_table(&self, id: &AssetId) -> Result<CsvTable, AssetError> {
        self.tables
            .get(id)
            .cloned()
            .ok_or_else(|| AssetError::UnknownAsset { id: id.clone() })
    }

    fn checksum(&self, _id: &AssetId) -> Option<String> {
        None
    }
}
