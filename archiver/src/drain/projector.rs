use archiver_config::shared::ProjectionConfig;
use serde_json::Map;
use thiserror::Error;

use crate::conversions::json::value_to_json;
use crate::error::{ArchiverError, ErrorKind};
use crate::types::{PrimaryKey, ProjectedPayload, SourceRecord, Value};

/// Per-record projection failures. The record is skipped, never sent nor deleted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("record is missing key attribute `{0}`")]
    MissingKey(String),

    #[error("attribute `{attribute}` cannot be converted: {reason}")]
    InvalidAttribute { attribute: String, reason: String },
}

impl From<ProjectionError> for ArchiverError {
    #[track_caller]
    fn from(err: ProjectionError) -> Self {
        let kind = match err {
            ProjectionError::MissingKey(_) => ErrorKind::MissingKey,
            ProjectionError::InvalidAttribute { .. } => ErrorKind::ConversionError,
        };

        ArchiverError::from((kind, "Record projection failed", err.to_string()))
    }
}

/// Maps source records onto the configured payload shape and primary key.
#[derive(Debug, Clone)]
pub struct Projector {
    output_attributes: Vec<String>,
    key_attributes: Vec<String>,
}

impl Projector {
    pub fn new(output_attributes: Vec<String>, key_attributes: Vec<String>) -> Self {
        Self {
            output_attributes,
            key_attributes,
        }
    }

    pub fn from_config(config: &ProjectionConfig) -> Self {
        Self::new(
            config.output_attributes.clone(),
            config.key_attributes.clone(),
        )
    }

    /// Builds the payload and the primary key of `record`.
    ///
    /// Output attributes absent from the record are emitted as `null`. Every key attribute
    /// must be present.
    pub fn project(
        &self,
        record: &SourceRecord,
    ) -> Result<(ProjectedPayload, PrimaryKey), ProjectionError> {
        let key = self.extract_key(record)?;

        let mut fields = Vec::with_capacity(self.output_attributes.len());
        for attribute in &self.output_attributes {
            let value = match record.get(attribute) {
                Some(value) => convert(attribute, value)?,
                None => serde_json::Value::Null,
            };
            fields.push((attribute.clone(), value));
        }

        Ok((ProjectedPayload::new(fields), key))
    }

    /// Copies the key attributes of `record` verbatim.
    pub fn extract_key(&self, record: &SourceRecord) -> Result<PrimaryKey, ProjectionError> {
        let mut attributes = Vec::with_capacity(self.key_attributes.len());
        for attribute in &self.key_attributes {
            let Some(value) = record.get(attribute) else {
                return Err(ProjectionError::MissingKey(attribute.clone()));
            };
            attributes.push((attribute.clone(), value.clone()));
        }

        Ok(PrimaryKey::new(attributes))
    }
}

/// Converts a whole record into a JSON object with normalized numbers.
pub fn normalize_record(record: &SourceRecord) -> Result<serde_json::Value, ProjectionError> {
    let mut map = Map::with_capacity(record.len());
    for (attribute, value) in record.attributes() {
        map.insert(attribute.clone(), convert(attribute, value)?);
    }

    Ok(serde_json::Value::Object(map))
}

fn convert(attribute: &str, value: &Value) -> Result<serde_json::Value, ProjectionError> {
    value_to_json(value).map_err(|err| ProjectionError::InvalidAttribute {
        attribute: attribute.to_string(),
        reason: err.detail().unwrap_or("unsupported value").to_string(),
    })
}
