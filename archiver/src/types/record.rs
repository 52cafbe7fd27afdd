use std::collections::BTreeMap;
use std::fmt;

use crate::types::Value;

/// A raw record read from the source store, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    attributes: BTreeMap<String, Value>,
}

impl SourceRecord {
    pub fn new(attributes: BTreeMap<String, Value>) -> Self {
        Self { attributes }
    }

    /// Returns the value of `name`, if the record carries it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn into_attributes(self) -> BTreeMap<String, Value> {
        self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns `true` when every attribute of `key` is present with an equal value.
    pub fn matches_key(&self, key: &PrimaryKey) -> bool {
        key.attributes()
            .iter()
            .all(|(name, value)| self.get(name) == Some(value))
    }
}

impl<K> FromIterator<(K, Value)> for SourceRecord
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// Identifies a record in the source store.
///
/// Holds the partition key and the optional sort key, in configured order, with values copied
/// verbatim from the record they were extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    attributes: Vec<(String, Value)>,
}

impl PrimaryKey {
    pub fn new(attributes: Vec<(String, Value)>) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &[(String, Value)] {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find_map(|(attribute, value)| (attribute == name).then_some(value))
    }

    pub fn into_attributes(self) -> Vec<(String, Value)> {
        self.attributes
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.attributes.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }

            match value {
                Value::String(value) => write!(f, "{name}={value}")?,
                Value::Number(value) => write!(f, "{name}={value}")?,
                other => write!(f, "{name}=<{}>", other.type_name())?,
            }
        }

        Ok(())
    }
}
