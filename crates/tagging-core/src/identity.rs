//! # Tag Identity
//!
//! The tag key is the only externally addressable handle of a tag. It is
//! assigned once when the tag is drafted and never changes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TagError;

/// Globally unique, immutable tag identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagKey(Uuid);

impl TagKey {
    /// Create a new random tag key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a tag key from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a tag key from its hyphenated UUID form.
    pub fn parse(s: &str) -> Result<Self, TagError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TagError::InvalidKey {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TagKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
