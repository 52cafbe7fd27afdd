use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Connection settings for the source record store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Name of the table that is drained.
    pub table_name: String,
    /// Region override. Falls back to the default provider chain when unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override, e.g. a local emulator.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Maximum number of items evaluated per scan page.
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("source.table_name"));
        }

        if self.page_size == Some(0) {
            return Err(ValidationError::InvalidFieldValue {
                field: "source.page_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
