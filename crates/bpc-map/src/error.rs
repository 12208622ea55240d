//! Error types for mapping operations.

use bpc_ingest::AssetError;
use bpc_model::AssetId;

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("asset {asset} has no {column} column")]
    MissingColumn { asset: AssetId, column: String },
}
