use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{BatchConfig, ProjectionConfig, SinkConfig, SourceConfig, ValidationError};

/// Complete configuration of an archiver run.
///
/// Aggregates the source table, the sink stream, the projection and the batching settings.
/// Typically loaded with [`crate::load_config`] at startup and validated before use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiverConfig {
    /// Source table that is drained.
    pub source: SourceConfig,
    /// Delivery stream receiving the projected records.
    pub sink: SinkConfig,
    /// Attributes forwarded to the sink and attributes identifying a record.
    pub projection: ProjectionConfig,
    /// Sink batching settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl ArchiverConfig {
    /// Validates every configuration section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.sink.validate()?;
        self.projection.validate()?;
        self.batch.validate()
    }
}

impl Config for ArchiverConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[
        "projection.output_attributes",
        "projection.key_attributes",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_default_batch() {
        let config: ArchiverConfig = serde_json::from_value(serde_json::json!({
            "source": { "table_name": "audit-log" },
            "sink": { "stream_name": "audit-log-stream" },
            "projection": {
                "output_attributes": ["module", "createdAt", "message"],
                "key_attributes": ["module", "createdAt"]
            }
        }))
        .unwrap();

        assert_eq!(config.batch.max_size, BatchConfig::DEFAULT_MAX_SIZE);
        assert_eq!(config.source.page_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_reports_first_invalid_section() {
        let config: ArchiverConfig = serde_json::from_value(serde_json::json!({
            "source": { "table_name": "" },
            "sink": { "stream_name": "audit-log-stream" },
            "projection": { "output_attributes": ["a"], "key_attributes": ["a"] }
        }))
        .unwrap();

        assert_eq!(
            config.validate().unwrap_err(),
            ValidationError::EmptyField("source.table_name")
        );
    }
}
