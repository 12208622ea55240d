use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Opaque identifier of an external asset (table, list or metadata file).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyAssetId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AssetId> for String {
    fn from(value: AssetId) -> Self {
        value.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_trims_and_rejects_blank() {
        let id = AssetId::new("  syn123 ").expect("valid id");
        assert_eq!(id.as_str(), "syn123");
        assert!(AssetId::new("   ").is_err());
    }

    #[test]
    fn asset_id_serializes_as_plain_string() {
        let id = AssetId::new("syn42").expect("valid id");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"syn42\"");
        let parsed: AssetId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, id);
    }
}
