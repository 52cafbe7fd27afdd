use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use archiver::error::{ArchiverError, ArchiverResult, ErrorKind};
use archiver::types::{PrimaryKey, SourceRecord, Value};
use archiver::bail;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use bigdecimal::BigDecimal;
use tracing::warn;

/// An item as returned by the DynamoDB API.
pub type Item = HashMap<String, AttributeValue>;

/// Converts a DynamoDB attribute into a [`Value`].
///
/// Sets become lists. Attribute types unknown to this SDK version are read as [`Value::Null`].
pub fn attribute_to_value(attribute: &AttributeValue) -> ArchiverResult<Value> {
    let value = match attribute {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(value) => Value::Bool(*value),
        AttributeValue::S(value) => Value::String(value.clone()),
        AttributeValue::N(value) => Value::Number(parse_number(value)?),
        AttributeValue::B(value) => Value::Binary(value.as_ref().to_vec()),
        AttributeValue::Ss(values) => {
            Value::List(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => Value::List(
            values
                .iter()
                .map(|value| parse_number(value).map(Value::Number))
                .collect::<ArchiverResult<_>>()?,
        ),
        AttributeValue::Bs(values) => Value::List(
            values
                .iter()
                .map(|value| Value::Binary(value.as_ref().to_vec()))
                .collect(),
        ),
        AttributeValue::L(values) => Value::List(
            values
                .iter()
                .map(attribute_to_value)
                .collect::<ArchiverResult<_>>()?,
        ),
        AttributeValue::M(values) => Value::Map(
            values
                .iter()
                .map(|(name, value)| {
                    Ok::<_, ArchiverError>((name.clone(), attribute_to_value(value)?))
                })
                .collect::<ArchiverResult<BTreeMap<_, _>>>()?,
        ),
        other => {
            warn!(attribute = ?other, "reading unsupported attribute type as null");
            Value::Null
        }
    };

    Ok(value)
}

/// Converts a [`Value`] back into a DynamoDB attribute.
pub fn value_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(value) => AttributeValue::Bool(*value),
        Value::String(value) => AttributeValue::S(value.clone()),
        Value::Number(value) => AttributeValue::N(value.to_string()),
        Value::Binary(value) => AttributeValue::B(Blob::new(value.clone())),
        Value::List(values) => AttributeValue::L(values.iter().map(value_to_attribute).collect()),
        Value::Map(values) => AttributeValue::M(
            values
                .iter()
                .map(|(name, value)| (name.clone(), value_to_attribute(value)))
                .collect(),
        ),
    }
}

/// Converts a scanned item into a [`SourceRecord`].
pub fn item_to_record(item: Item) -> ArchiverResult<SourceRecord> {
    item.iter()
        .map(|(name, attribute)| {
            Ok::<_, ArchiverError>((name.clone(), attribute_to_value(attribute)?))
        })
        .collect::<ArchiverResult<BTreeMap<_, _>>>()
        .map(SourceRecord::new)
}

/// Converts a primary key into the item key expected by delete requests.
pub fn key_to_item(key: &PrimaryKey) -> Item {
    key.attributes()
        .iter()
        .map(|(name, value)| (name.clone(), value_to_attribute(value)))
        .collect()
}

fn parse_number(value: &str) -> ArchiverResult<BigDecimal> {
    match BigDecimal::from_str(value) {
        Ok(number) => Ok(number),
        Err(err) => bail!(
            ErrorKind::ConversionError,
            "Number attribute is not a valid decimal",
            detail = format!("value {value:?}"),
            source: err
        ),
    }
}
