//! # Timestamps
//!
//! Every instant a tag records (`created_at`, `invalidated_at`,
//! `activation_date`, `expiration_date`) is a [`Timestamp`]: UTC with
//! whole-second precision.
//!
//! Input text may be RFC 3339 with any offset, or a bare `YYYY-MM-DD` date
//! meaning midnight UTC. Output is always `YYYY-MM-DDTHH:MM:SSZ`, and that
//! is also the serde representation.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TagError;

const DATE_ONLY: &str = "%Y-%m-%d";

/// A UTC instant with whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Wrap a chrono instant, dropping sub-second precision.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(0))
    }

    /// Parse an RFC 3339 instant (any offset) or a bare date.
    ///
    /// # Errors
    ///
    /// [`TagError::InvalidTimestamp`] when the text is neither form.
    pub fn parse(text: &str) -> Result<Self, TagError> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self::from_utc(dt.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(text, DATE_ONLY)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc()))
            .ok_or_else(|| TagError::InvalidTimestamp {
                value: text.to_string(),
                reason: "expected an RFC 3339 timestamp or a YYYY-MM-DD date".to_string(),
            })
    }

    /// The chrono instant.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl std::str::FromStr for Timestamp {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TagError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}
