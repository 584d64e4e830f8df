//! # External Keys
//!
//! Structured identifiers minted by the system of record, such as course
//! locators. Policies can demand that a field parses as a given key kind;
//! the engine asks an [`ExternalKeyParser`] to do the parsing so deployments
//! can plug in additional kinds.
//!
//! ## Supported Kinds ([`StandardKeyParser`])
//!
//! | Kind | Form |
//! |------|------|
//! | `CourseKey` | `course-v1:Org+Course+Run`, legacy `Org/Course/Run` |
//! | `UsageKey` | `block-v1:Org+Course+Run+type@T+block@B` |
//!
//! Each component is non-empty and made of alphanumerics and `_-~.:`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const COURSE_PREFIX: &str = "course-v1:";
const BLOCK_PREFIX: &str = "block-v1:";

/// Errors from external key parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalKeyError {
    /// The parser does not know this key kind.
    #[error("unsupported external key kind: \"{0}\"")]
    UnsupportedKind(String),

    /// The text is not a well-formed key of the requested kind.
    #[error("\"{value}\" is not a valid {kind}: {reason}")]
    Malformed {
        /// Requested key kind.
        kind: String,
        /// The offending text.
        value: String,
        /// Why parsing failed.
        reason: String,
    },
}

/// Parses external key text for a named key kind.
pub trait ExternalKeyParser: Send + Sync {
    /// Whether `kind` names a key kind this parser understands.
    fn supports(&self, kind: &str) -> bool;

    /// Parse `text` as a key of `kind`.
    ///
    /// # Errors
    ///
    /// [`ExternalKeyError::UnsupportedKind`] for unknown kinds,
    /// [`ExternalKeyError::Malformed`] when the text does not parse.
    fn parse(&self, kind: &str, text: &str) -> Result<ExternalKey, ExternalKeyError>;
}

/// A parsed course key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseKey {
    /// Organization.
    pub org: String,
    /// Course number.
    pub course: String,
    /// Course run.
    pub run: String,
    /// Whether the key used the legacy slash-separated form.
    pub legacy: bool,
}

impl CourseKey {
    /// Parse either the `course-v1:` form or the legacy slash form.
    pub fn parse(text: &str) -> Result<Self, String> {
        if let Some(body) = text.strip_prefix(COURSE_PREFIX) {
            let parts = split_components(body, '+', 3)?;
            return Ok(Self {
                org: parts[0].to_string(),
                course: parts[1].to_string(),
                run: parts[2].to_string(),
                legacy: false,
            });
        }
        if text.contains('/') {
            let parts = split_components(text, '/', 3)?;
            return Ok(Self {
                org: parts[0].to_string(),
                course: parts[1].to_string(),
                run: parts[2].to_string(),
                legacy: true,
            });
        }
        Err(format!("expected \"{COURSE_PREFIX}Org+Course+Run\" or \"Org/Course/Run\""))
    }
}

impl std::fmt::Display for CourseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.legacy {
            write!(f, "{}/{}/{}", self.org, self.course, self.run)
        } else {
            write!(f, "{COURSE_PREFIX}{}+{}+{}", self.org, self.course, self.run)
        }
    }
}

/// A parsed usage (block) key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageKey {
    /// The course the block lives in.
    pub course: CourseKey,
    /// Block type, e.g. `problem`.
    pub block_type: String,
    /// Block identifier.
    pub block_id: String,
}

impl UsageKey {
    /// Parse the `block-v1:` form.
    pub fn parse(text: &str) -> Result<Self, String> {
        let body = text
            .strip_prefix(BLOCK_PREFIX)
            .ok_or_else(|| format!("expected prefix \"{BLOCK_PREFIX}\""))?;
        let parts: Vec<&str> = body.split('+').collect();
        if parts.len() != 5 {
            return Err(format!(
                "expected 5 '+'-separated components, found {}",
                parts.len()
            ));
        }
        let block_type = parts[3]
            .strip_prefix("type@")
            .ok_or_else(|| "fourth component must be \"type@<block type>\"".to_string())?;
        let block_id = parts[4]
            .strip_prefix("block@")
            .ok_or_else(|| "fifth component must be \"block@<block id>\"".to_string())?;
        for part in [parts[0], parts[1], parts[2], block_type, block_id] {
            check_component(part)?;
        }
        Ok(Self {
            course: CourseKey {
                org: parts[0].to_string(),
                course: parts[1].to_string(),
                run: parts[2].to_string(),
                legacy: false,
            },
            block_type: block_type.to_string(),
            block_id: block_id.to_string(),
        })
    }
}

impl std::fmt::Display for UsageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{BLOCK_PREFIX}{}+{}+{}+type@{}+block@{}",
            self.course.org, self.course.course, self.course.run, self.block_type, self.block_id
        )
    }
}

/// Any key the standard parser produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExternalKey {
    /// A course key.
    Course(CourseKey),
    /// A usage key.
    Usage(UsageKey),
}

/// Parser for the built-in key kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardKeyParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StandardKind {
    Course,
    Usage,
}

impl StandardKind {
    fn from_name(kind: &str) -> Option<Self> {
        let normalized: String = kind
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "coursekey" | "courselocator" => Some(Self::Course),
            "usagekey" | "blockusagelocator" => Some(Self::Usage),
            _ => None,
        }
    }
}

impl ExternalKeyParser for StandardKeyParser {
    fn supports(&self, kind: &str) -> bool {
        StandardKind::from_name(kind).is_some()
    }

    fn parse(&self, kind: &str, text: &str) -> Result<ExternalKey, ExternalKeyError> {
        let parsed = match StandardKind::from_name(kind) {
            Some(StandardKind::Course) => CourseKey::parse(text).map(ExternalKey::Course),
            Some(StandardKind::Usage) => UsageKey::parse(text).map(ExternalKey::Usage),
            None => return Err(ExternalKeyError::UnsupportedKind(kind.to_string())),
        };
        parsed.map_err(|reason| ExternalKeyError::Malformed {
            kind: kind.to_string(),
            value: text.to_string(),
            reason,
        })
    }
}

fn split_components(body: &str, sep: char, expected: usize) -> Result<Vec<&str>, String> {
    let parts: Vec<&str> = body.split(sep).collect();
    if parts.len() != expected {
        return Err(format!(
            "expected {expected} '{sep}'-separated components, found {}",
            parts.len()
        ));
    }
    for part in &parts {
        check_component(part)?;
    }
    Ok(parts)
}

fn check_component(part: &str) -> Result<(), String> {
    if part.is_empty() {
        return Err("empty component".to_string());
    }
    match part.chars().find(|c| !is_key_char(*c)) {
        Some(bad) => Err(format!("invalid character {bad:?} in \"{part}\"")),
        None => Ok(()),
    }
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '~' | '.' | ':')
}
