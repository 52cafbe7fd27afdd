use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Map;

use crate::conversions::numeric::normalize_decimal;
use crate::error::ArchiverResult;
use crate::types::Value;

/// Converts a source value into JSON, normalizing numbers recursively.
///
/// Binary values are encoded as standard base64 strings.
pub fn value_to_json(value: &Value) -> ArchiverResult<serde_json::Value> {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(value) => serde_json::Value::Bool(*value),
        Value::String(value) => serde_json::Value::String(value.clone()),
        Value::Number(value) => serde_json::Value::Number(normalize_decimal(value)?),
        Value::Binary(bytes) => serde_json::Value::String(STANDARD.encode(bytes)),
        Value::List(values) => serde_json::Value::Array(
            values
                .iter()
                .map(value_to_json)
                .collect::<ArchiverResult<Vec<_>>>()?,
        ),
        Value::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (name, value) in entries {
                map.insert(name.clone(), value_to_json(value)?);
            }
            serde_json::Value::Object(map)
        }
    };

    Ok(json)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_numbers_are_normalized() {
        let value = Value::Map(BTreeMap::from([
            (
                "counts".to_string(),
                Value::List(vec![
                    Value::Number(BigDecimal::from_str("3.0").unwrap()),
                    Value::Number(BigDecimal::from_str("2.5").unwrap()),
                ]),
            ),
            ("enabled".to_string(), Value::Bool(true)),
            ("blob".to_string(), Value::Binary(b"hi".to_vec())),
            ("missing".to_string(), Value::Null),
        ]));

        assert_eq!(
            value_to_json(&value).unwrap(),
            json!({
                "counts": [3, 2.5],
                "enabled": true,
                "blob": "aGk=",
                "missing": null
            })
        );
    }
}
