//! # Access and Status Enumerations
//!
//! [`AccessLevel`] is ordered: a larger value is a stronger restriction.
//! [`TagStatus`] is derived from `invalidated_at` and is never accepted
//! from callers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TagError;

/// Visibility of a tag. `Public < Protected < Private`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AccessLevel {
    /// Visible to anyone who can see the target.
    #[default]
    Public = 1,
    /// Visible to the owner and privileged readers.
    Protected = 2,
    /// Visible to the owner only.
    Private = 3,
}

impl AccessLevel {
    /// All levels in increasing order of restriction.
    pub fn all() -> &'static [AccessLevel] {
        &[Self::Public, Self::Protected, Self::Private]
    }

    /// The numeric value (1-3).
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// The choice name used in policies (`PUBLIC`, `PROTECTED`, `PRIVATE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Protected => "PROTECTED",
            Self::Private => "PRIVATE",
        }
    }

    /// Whether this level restricts at least as much as `other`.
    pub fn is_at_least(&self, other: AccessLevel) -> bool {
        *self >= other
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = TagError;

    /// Accepts the choice name in any case, or the numeric value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" | "1" => Ok(Self::Public),
            "PROTECTED" | "2" => Ok(Self::Protected),
            "PRIVATE" | "3" => Ok(Self::Private),
            _ => Err(TagError::InvalidAccess(s.to_string())),
        }
    }
}

/// Whether a tag is live or soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagStatus {
    /// Not invalidated.
    Valid,
    /// Soft-deleted; `invalidated_at` is set.
    Invalid,
}

impl TagStatus {
    /// The choice name (`VALID`, `INVALID`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
        }
    }
}

impl std::fmt::Display for TagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
