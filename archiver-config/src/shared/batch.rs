use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Batching configuration for sink submissions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Maximum number of records submitted to the sink in a single call.
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
}

impl BatchConfig {
    /// Default batch size, equal to the sink's per-call record limit.
    pub const DEFAULT_MAX_SIZE: usize = 500;

    /// Hard per-call record limit of the sink ingestion service.
    pub const SINK_HARD_LIMIT: usize = 500;

    /// Validates batch configuration settings.
    ///
    /// `max_size` must be in `1..=SINK_HARD_LIMIT`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_size == 0 || self.max_size > Self::SINK_HARD_LIMIT {
            return Err(ValidationError::InvalidFieldValue {
                field: "batch.max_size".to_string(),
                constraint: format!("must be between 1 and {}", Self::SINK_HARD_LIMIT),
            });
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_batch_max_size(),
        }
    }
}

fn default_batch_max_size() -> usize {
    BatchConfig::DEFAULT_MAX_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_batch_is_valid() {
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_and_oversized_batches() {
        assert!(BatchConfig { max_size: 0 }.validate().is_err());
        assert!(BatchConfig { max_size: 501 }.validate().is_err());
        assert!(BatchConfig { max_size: 500 }.validate().is_ok());
    }
}
