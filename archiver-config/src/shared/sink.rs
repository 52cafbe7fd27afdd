use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Connection settings for the sink ingestion service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SinkConfig {
    /// Name of the delivery stream receiving archived records.
    pub stream_name: String,
    /// Region override. Falls back to the default provider chain when unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override, e.g. a local emulator.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl SinkConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stream_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("sink.stream_name"));
        }

        Ok(())
    }
}
