use std::collections::BTreeMap;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::error::{ArchiverError, ArchiverResult};
use crate::types::{SourceRecord, Value};

/// Event name of a change event describing a removed record.
pub const REMOVE_EVENT_NAME: &str = "REMOVE";

/// Principal recorded on removals performed by the store itself, i.e. time-to-live expiry.
pub const STORE_SERVICE_PRINCIPAL: &str = "dynamodb.amazonaws.com";

/// A change-event document as delivered by the store's change stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamEventBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(rename = "eventSourceARN", default)]
    pub event_source_arn: Option<String>,
    #[serde(default)]
    pub user_identity: Option<UserIdentity>,
    #[serde(default)]
    pub dynamodb: Option<StreamImages>,
}

impl StreamEvent {
    /// Returns `true` for removals performed by the store's time-to-live process.
    pub fn is_ttl_removal(&self) -> bool {
        self.event_name.as_deref() == Some(REMOVE_EVENT_NAME)
            && self
                .user_identity
                .as_ref()
                .and_then(|identity| identity.principal_id.as_deref())
                == Some(STORE_SERVICE_PRINCIPAL)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(default)]
    pub principal_id: Option<String>,
    #[serde(rename = "type", default)]
    pub identity_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamImages {
    #[serde(default)]
    pub keys: Option<BTreeMap<String, StreamAttribute>>,
    #[serde(default)]
    pub old_image: Option<BTreeMap<String, StreamAttribute>>,
    #[serde(default)]
    pub new_image: Option<BTreeMap<String, StreamAttribute>>,
}

/// A typed attribute value in the store's change-event JSON, e.g. `{"N": "42"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StreamAttribute {
    #[serde(rename = "S")]
    String(String),
    #[serde(rename = "N")]
    Number(String),
    #[serde(rename = "B")]
    Binary(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "M")]
    Map(BTreeMap<String, StreamAttribute>),
    #[serde(rename = "L")]
    List(Vec<StreamAttribute>),
    #[serde(rename = "SS")]
    StringSet(Vec<String>),
    #[serde(rename = "NS")]
    NumberSet(Vec<String>),
    #[serde(rename = "BS")]
    BinarySet(Vec<String>),
}

impl StreamAttribute {
    /// Converts the attribute into a [`Value`]. Numbers are parsed exactly, binaries are
    /// decoded from base64 and sets become lists.
    pub fn into_value(self) -> ArchiverResult<Value> {
        let value = match self {
            StreamAttribute::String(value) => Value::String(value),
            StreamAttribute::Number(value) => Value::Number(BigDecimal::from_str(&value)?),
            StreamAttribute::Binary(value) => Value::Binary(STANDARD.decode(value)?),
            StreamAttribute::Bool(value) => Value::Bool(value),
            StreamAttribute::Null(_) => Value::Null,
            StreamAttribute::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(name, value)| Ok::<_, ArchiverError>((name, value.into_value()?)))
                    .collect::<ArchiverResult<_>>()?,
            ),
            StreamAttribute::List(values) => Value::List(
                values
                    .into_iter()
                    .map(StreamAttribute::into_value)
                    .collect::<ArchiverResult<_>>()?,
            ),
            StreamAttribute::StringSet(values) => {
                Value::List(values.into_iter().map(Value::String).collect())
            }
            StreamAttribute::NumberSet(values) => Value::List(
                values
                    .iter()
                    .map(|value| Ok::<_, ArchiverError>(Value::Number(BigDecimal::from_str(value)?)))
                    .collect::<ArchiverResult<_>>()?,
            ),
            StreamAttribute::BinarySet(values) => Value::List(
                values
                    .iter()
                    .map(|value| Ok::<_, ArchiverError>(Value::Binary(STANDARD.decode(value)?)))
                    .collect::<ArchiverResult<_>>()?,
            ),
        };

        Ok(value)
    }
}

/// Converts a change-event image into a record.
pub fn image_to_record(image: BTreeMap<String, StreamAttribute>) -> ArchiverResult<SourceRecord> {
    let attributes = image
        .into_iter()
        .map(|(name, attribute)| Ok::<_, ArchiverError>((name, attribute.into_value()?)))
        .collect::<ArchiverResult<BTreeMap<_, _>>>()?;

    Ok(SourceRecord::new(attributes))
}

/// Extracts the table name from a stream ARN (`arn:...:table/<NAME>/stream/<LABEL>`).
pub fn table_name_from_arn(arn: &str) -> Option<&str> {
    arn.split('/').nth(1).filter(|name| !name.is_empty())
}
