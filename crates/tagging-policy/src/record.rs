//! # Policy Records
//!
//! A policy record is the raw configuration entry for one `tag_type`:
//!
//! ```yaml
//! - tag_type: example_tag_1
//!   validate_tag_value:
//!     in: [v1, v2]
//!   validate_target_object: User
//!   validate_owner_object: User
//! ```
//!
//! Clause order matters (the engine evaluates in configuration order), so
//! the record is read from a `serde_yaml::Mapping`, which keeps insertion
//! order, and stored as an ordered list of [`RawClause`]s. Keys other than
//! `tag_type` that lack the `validate_` prefix are ignored with a warning.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_yaml::{Mapping, Value};

use crate::error::PolicyLoadError;

/// Prefix that marks a clause key.
pub const CLAUSE_PREFIX: &str = "validate_";

const TAG_TYPE_KEY: &str = "tag_type";

/// One unparsed clause: `validate_<field>` and its configured value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClause {
    /// The full key, including the `validate_` prefix.
    pub key: String,
    /// A scalar literal, a list, or a predicate mapping.
    pub value: Value,
}

impl RawClause {
    /// The field name the clause targets.
    pub fn field_name(&self) -> &str {
        self.key.strip_prefix(CLAUSE_PREFIX).unwrap_or(&self.key)
    }
}

/// The configured policy for one tag type, clauses in configuration order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Mapping")]
pub struct PolicyRecord {
    tag_type: String,
    clauses: Vec<RawClause>,
}

impl PolicyRecord {
    /// Start a record with no clauses.
    pub fn new(tag_type: impl Into<String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            clauses: Vec::new(),
        }
    }

    /// Append a clause for `field` (the `validate_` prefix is added).
    pub fn with_clause(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(RawClause {
            key: format!("{CLAUSE_PREFIX}{field}"),
            value: value.into(),
        });
        self
    }

    /// The tag type this record governs.
    pub fn tag_type(&self) -> &str {
        &self.tag_type
    }

    /// Clauses in configuration order.
    pub fn clauses(&self) -> &[RawClause] {
        &self.clauses
    }
}

impl TryFrom<Mapping> for PolicyRecord {
    type Error = PolicyLoadError;

    fn try_from(mapping: Mapping) -> Result<Self, Self::Error> {
        let mut tag_type = None;
        let mut clauses = Vec::new();
        let mut ignored = Vec::new();

        for (key, value) in mapping {
            let Value::String(key) = key else {
                return Err(PolicyLoadError::NonStringKey {
                    tag_type: tag_type.unwrap_or_else(|| "?".to_string()),
                });
            };
            if key == TAG_TYPE_KEY {
                match value {
                    Value::String(s) if !s.trim().is_empty() => tag_type = Some(s),
                    _ => return Err(PolicyLoadError::MissingTagType),
                }
            } else if key.starts_with(CLAUSE_PREFIX) {
                clauses.push(RawClause { key, value });
            } else {
                ignored.push(key);
            }
        }

        let tag_type = tag_type.ok_or(PolicyLoadError::MissingTagType)?;
        for key in ignored {
            tracing::warn!(tag_type = %tag_type, key = %key, "ignoring policy key without validate_ prefix");
        }
        Ok(Self { tag_type, clauses })
    }
}

impl Serialize for PolicyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.clauses.len() + 1))?;
        map.serialize_entry(TAG_TYPE_KEY, &self.tag_type)?;
        for clause in &self.clauses {
            map.serialize_entry(&clause.key, &clause.value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clauses_keep_configuration_order() {
        let yaml = "tag_type: t\nvalidate_tag_value: a\nvalidate_access: PRIVATE\nvalidate_target_object: User\n";
        let record: PolicyRecord = serde_yaml::from_str(yaml).unwrap();
        let fields: Vec<&str> = record.clauses().iter().map(|c| c.field_name()).collect();
        assert_eq!(fields, vec!["tag_value", "access", "target_object"]);
    }

    #[test]
    fn non_clause_keys_are_dropped() {
        let yaml = "tag_type: t\ndescription: free text\nvalidate_tag_value: a\n";
        let record: PolicyRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record.clauses().len(), 1);
    }

    #[test]
    fn missing_tag_type_is_rejected() {
        let err = serde_yaml::from_str::<PolicyRecord>("validate_tag_value: a\n").unwrap_err();
        assert!(err.to_string().contains("no tag_type"));
    }

    #[test]
    fn blank_tag_type_is_rejected() {
        assert!(serde_yaml::from_str::<PolicyRecord>("tag_type: ''\n").is_err());
    }

    #[test]
    fn serializes_back_to_flat_mapping() {
        let record = PolicyRecord::new("t").with_clause("target_object", "User");
        let yaml = serde_yaml::to_string(&record).unwrap();
        let back: PolicyRecord = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, record);
    }
}
