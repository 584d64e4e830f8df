//! Typed clauses produced by the structure check.

use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;

use tagging_core::{ExternalKeyParser, FieldValue, ReferenceKind, Tag, TagField};

use crate::predicate::{self, PredicateFailure, PredicateKind};

/// A predicate with its checked argument.
#[derive(Debug, Clone)]
pub enum ClauseCheck {
    /// `equals` (also any bare scalar clause).
    Equals(String),
    /// `in` (also any bare list clause).
    InSet(BTreeSet<String>),
    /// `exists`.
    Exists,
    /// `regex`, compiled once.
    Regex(Regex),
    /// `object`.
    ObjectIs(ReferenceKind),
    /// `external_key_format`, kind already known to the key parser.
    ExternalKeyFormat(String),
}

impl ClauseCheck {
    /// The predicate this check runs.
    pub fn predicate(&self) -> PredicateKind {
        match self {
            Self::Equals(_) => PredicateKind::Equals,
            Self::InSet(_) => PredicateKind::In,
            Self::Exists => PredicateKind::Exists,
            Self::Regex(_) => PredicateKind::Regex,
            Self::ObjectIs(_) => PredicateKind::Object,
            Self::ExternalKeyFormat(_) => PredicateKind::ExternalKeyFormat,
        }
    }

    /// Run the predicate against one field value.
    pub fn evaluate(
        &self,
        value: &FieldValue<'_>,
        keys: &dyn ExternalKeyParser,
    ) -> Result<(), PredicateFailure> {
        match self {
            Self::Equals(expected) => predicate::equals(value, expected),
            Self::InSet(allowed) => predicate::in_set(value, allowed),
            Self::Exists => predicate::exists(value),
            Self::Regex(pattern) => predicate::regex_search(value, pattern),
            Self::ObjectIs(kind) => predicate::object(value, *kind),
            Self::ExternalKeyFormat(kind) => predicate::external_key_format(value, kind, keys),
        }
    }
}

impl fmt::Display for ClauseCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => write!(f, "equals {v:?}"),
            Self::InSet(values) => {
                let joined: Vec<&str> = values.iter().map(String::as_str).collect();
                write!(f, "in [{}]", joined.join(", "))
            }
            Self::Exists => f.write_str("exists"),
            Self::Regex(re) => write!(f, "regex /{}/", re.as_str()),
            Self::ObjectIs(kind) => write!(f, "object {}", kind.type_name()),
            Self::ExternalKeyFormat(kind) => write!(f, "external_key_format {kind}"),
        }
    }
}

/// One compiled clause: a field and the check applied to it.
#[derive(Debug, Clone)]
pub struct Clause {
    /// The tag attribute this clause reads.
    pub field: TagField,
    /// The check.
    pub check: ClauseCheck,
}

impl Clause {
    /// Read the field from `tag` and run the check.
    pub fn evaluate(&self, tag: &Tag, keys: &dyn ExternalKeyParser) -> Result<(), PredicateFailure> {
        self.check.evaluate(&tag.field(self.field), keys)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagging_core::{Reference, StandardKeyParser, TagDraft};

    #[test]
    fn clause_reads_named_field() {
        let tag = TagDraft::new("t", "v1")
            .with_target(Reference::user("alice"))
            .build()
            .unwrap();
        let allowed: BTreeSet<String> = ["v1".to_string()].into_iter().collect();
        let clause = Clause {
            field: TagField::TagValue,
            check: ClauseCheck::InSet(allowed),
        };
        assert!(clause.evaluate(&tag, &StandardKeyParser).is_ok());

        let target = Clause {
            field: TagField::TargetObject,
            check: ClauseCheck::ObjectIs(ReferenceKind::Site),
        };
        assert!(target.evaluate(&tag, &StandardKeyParser).is_err());
    }

    #[test]
    fn display_is_readable() {
        let clause = Clause {
            field: TagField::TagValue,
            check: ClauseCheck::InSet(["b".to_string(), "a".to_string()].into_iter().collect()),
        };
        assert_eq!(clause.to_string(), "tag_value: in [a, b]");
        assert_eq!(ClauseCheck::Exists.predicate(), PredicateKind::Exists);
    }
}
