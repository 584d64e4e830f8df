//! # Policy Store
//!
//! Read-only lookup from `tag_type` to its [`PolicyRecord`]. Built once at
//! startup from the deployment's `tag_definitions` list; no mutation is
//! exposed afterwards. A tag type that appears twice is a load error rather
//! than a silent first-match.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::PolicyLoadError;
use crate::record::PolicyRecord;

/// Policy records indexed by tag type, iterated in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<PolicyRecord>")]
pub struct PolicyStore {
    records: Vec<PolicyRecord>,
    index: BTreeMap<String, usize>,
}

impl PolicyStore {
    /// Index `records`, rejecting duplicate tag types.
    pub fn from_records(records: Vec<PolicyRecord>) -> Result<Self, PolicyLoadError> {
        let mut index = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.tag_type().to_string(), i).is_some() {
                return Err(PolicyLoadError::DuplicateTagType {
                    tag_type: record.tag_type().to_string(),
                });
            }
        }
        tracing::debug!(count = records.len(), "policy store loaded");
        Ok(Self { records, index })
    }

    /// Parse a YAML (or JSON) list of policy records.
    pub fn from_yaml_str(source: &str) -> Result<Self, PolicyLoadError> {
        let records: Vec<PolicyRecord> = serde_yaml::from_str(source)?;
        Self::from_records(records)
    }

    /// The policy for `tag_type`, if configured.
    pub fn get_policy(&self, tag_type: &str) -> Option<&PolicyRecord> {
        self.index.get(tag_type).and_then(|&i| self.records.get(i))
    }

    /// Records in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &PolicyRecord> {
        self.records.iter()
    }

    /// Configured tag types in configuration order.
    pub fn tag_types(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(PolicyRecord::tag_type)
    }

    /// Number of configured tag types.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no tag types are configured.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<Vec<PolicyRecord>> for PolicyStore {
    type Error = PolicyLoadError;

    fn try_from(records: Vec<PolicyRecord>) -> Result<Self, Self::Error> {
        Self::from_records(records)
    }
}
