use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Selects which attributes are forwarded to the sink and which identify a record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProjectionConfig {
    /// Attributes copied into every sink payload, in output order.
    pub output_attributes: Vec<String>,
    /// Primary-key attributes of the source table: partition key, then optional sort key.
    pub key_attributes: Vec<String>,
}

impl ProjectionConfig {
    /// Maximum number of key attributes (partition key plus sort key).
    pub const MAX_KEY_ATTRIBUTES: usize = 2;

    /// Validates the projection.
    ///
    /// Requires at least one output attribute, one or two key attributes, and no duplicates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.output_attributes.is_empty() {
            return Err(ValidationError::EmptyField("projection.output_attributes"));
        }

        if self.key_attributes.is_empty() || self.key_attributes.len() > Self::MAX_KEY_ATTRIBUTES {
            return Err(ValidationError::InvalidFieldValue {
                field: "projection.key_attributes".to_string(),
                constraint: format!(
                    "must contain between 1 and {} attribute names",
                    Self::MAX_KEY_ATTRIBUTES
                ),
            });
        }

        check_names("projection.output_attributes", &self.output_attributes)?;
        check_names("projection.key_attributes", &self.key_attributes)
    }
}

fn check_names(field: &'static str, names: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField(field));
        }

        if !seen.insert(name.as_str()) {
            return Err(ValidationError::DuplicateAttribute {
                field,
                attribute: name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection(output: &[&str], key: &[&str]) -> ProjectionConfig {
        ProjectionConfig {
            output_attributes: output.iter().map(|s| s.to_string()).collect(),
            key_attributes: key.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn accepts_partition_and_sort_key() {
        let config = projection(&["module", "createdAt", "actor"], &["module", "createdAt"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_key_attribute_count_out_of_range() {
        assert!(projection(&["a"], &[]).validate().is_err());
        assert!(projection(&["a"], &["a", "b", "c"]).validate().is_err());
    }

    #[test]
    fn rejects_duplicate_output_attribute() {
        let err = projection(&["a", "a"], &["a"]).validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateAttribute {
                field: "projection.output_attributes",
                attribute: "a".to_string(),
            }
        );
    }
}
