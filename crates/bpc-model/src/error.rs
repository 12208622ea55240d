use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown output category: {name}")]
    UnknownCategory { name: String },
    #[error("asset id must not be empty")]
    EmptyAssetId,
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
