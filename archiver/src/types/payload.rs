use serde::ser::{Serialize, SerializeMap, Serializer};

/// The sink-facing projection of a source record.
///
/// Holds exactly the configured output attributes, in configured order. Attributes missing
/// from the record are present with a JSON `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPayload {
    fields: Vec<(String, serde_json::Value)>,
}

impl ProjectedPayload {
    pub fn new(fields: Vec<(String, serde_json::Value)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, serde_json::Value)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields
            .iter()
            .find_map(|(field, value)| (field == name).then_some(value))
    }
}

impl Serialize for ProjectedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_fields_in_configured_order() {
        let payload = ProjectedPayload::new(vec![
            ("module".to_string(), json!("events")),
            ("createdAt".to_string(), json!(1700000000)),
            ("actor".to_string(), serde_json::Value::Null),
        ]);

        let rendered = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            rendered,
            r#"{"module":"events","createdAt":1700000000,"actor":null}"#
        );
    }
}
