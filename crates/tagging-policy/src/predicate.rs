//! # Predicate Library
//!
//! Atomic checks of one tag field against one clause argument. Each
//! function is pure: it reads a [`FieldValue`] and returns `Ok(())` or a
//! [`PredicateFailure`] with a human-readable reason.
//!
//! | Predicate | Passes when |
//! |-----------|-------------|
//! | `equals` | display name equals the argument ignoring case; an empty field passes |
//! | `in` | the field text is a member of the set |
//! | `exists` | the field is non-empty |
//! | `regex` | the pattern matches somewhere in the field text |
//! | `object` | the referenced kind matches; no reference passes |
//! | `external_key_format` | the field text parses as the key kind |
//!
//! Predicate names are resolved once, when policies are compiled, through
//! the [`PredicateRegistry`].

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use thiserror::Error;

use tagging_core::{ExternalKeyError, ExternalKeyParser, FieldValue, ReferenceKind};

/// The closed set of predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PredicateKind {
    /// Case-insensitive equality on the display name.
    Equals,
    /// Set membership.
    In,
    /// Non-empty.
    Exists,
    /// Pattern search.
    Regex,
    /// Reference kind.
    Object,
    /// External key parse.
    ExternalKeyFormat,
}

impl PredicateKind {
    /// Every predicate.
    pub fn all() -> &'static [PredicateKind] {
        &[
            Self::Equals,
            Self::In,
            Self::Exists,
            Self::Regex,
            Self::Object,
            Self::ExternalKeyFormat,
        ]
    }

    /// Canonical name as written in policies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::In => "in",
            Self::Exists => "exists",
            Self::Regex => "regex",
            Self::Object => "object",
            Self::ExternalKeyFormat => "external_key_format",
        }
    }
}

impl std::fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name-to-predicate dispatch table, built once at startup.
#[derive(Debug, Clone)]
pub struct PredicateRegistry {
    by_name: HashMap<String, PredicateKind>,
}

impl PredicateRegistry {
    /// Canonical names plus the `opaque_key` / `OpaqueKey` aliases.
    pub fn standard() -> Self {
        let mut by_name: HashMap<String, PredicateKind> = PredicateKind::all()
            .iter()
            .map(|k| (k.as_str().to_string(), *k))
            .collect();
        by_name.insert("opaque_key".to_string(), PredicateKind::ExternalKeyFormat);
        by_name.insert("OpaqueKey".to_string(), PredicateKind::ExternalKeyFormat);
        Self { by_name }
    }

    /// Add an alias for an existing predicate.
    pub fn with_alias(mut self, name: impl Into<String>, kind: PredicateKind) -> Self {
        self.by_name.insert(name.into(), kind);
        self
    }

    /// Resolve a predicate name. Names are case-sensitive.
    pub fn lookup(&self, name: &str) -> Option<PredicateKind> {
        self.by_name.get(name).copied()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Why a predicate rejected a field value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredicateFailure {
    /// The value does not satisfy the predicate.
    #[error("{0}")]
    Mismatch(String),

    /// The value is not a well-formed external key.
    #[error(transparent)]
    MalformedKey(#[from] ExternalKeyError),
}

fn mismatch(reason: impl Into<String>) -> PredicateFailure {
    PredicateFailure::Mismatch(reason.into())
}

/// `equals`: display name equals `expected`, ignoring case.
///
/// Access levels also match their numeric value.
pub fn equals(value: &FieldValue<'_>, expected: &str) -> Result<(), PredicateFailure> {
    let Some(actual) = value.display_name() else {
        return Ok(());
    };
    if actual.is_empty() || actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    if let FieldValue::Access(level) = value {
        if level.value().to_string() == expected.trim() {
            return Ok(());
        }
    }
    Err(mismatch(format!("expected \"{expected}\", found \"{actual}\"")))
}

/// `in`: the field text is one of `allowed`.
pub fn in_set(value: &FieldValue<'_>, allowed: &BTreeSet<String>) -> Result<(), PredicateFailure> {
    match value.as_text() {
        Some(text) if !text.is_empty() && allowed.contains(&text) => Ok(()),
        Some(text) if !text.is_empty() => Err(mismatch(format!(
            "\"{text}\" is not one of the allowed values"
        ))),
        _ => Err(mismatch("field is empty")),
    }
}

/// `exists`: the field is non-empty.
pub fn exists(value: &FieldValue<'_>) -> Result<(), PredicateFailure> {
    if value.is_empty() {
        Err(mismatch("field is empty"))
    } else {
        Ok(())
    }
}

/// `regex`: `pattern` matches somewhere in the field text.
pub fn regex_search(value: &FieldValue<'_>, pattern: &Regex) -> Result<(), PredicateFailure> {
    match value.as_text() {
        Some(text) if pattern.is_match(&text) => Ok(()),
        Some(text) if !text.is_empty() => Err(mismatch(format!(
            "\"{text}\" does not match /{}/",
            pattern.as_str()
        ))),
        _ => Err(mismatch("field is empty")),
    }
}

/// `object`: the referenced kind is `expected`. A field without a
/// reference passes.
pub fn object(value: &FieldValue<'_>, expected: ReferenceKind) -> Result<(), PredicateFailure> {
    match value.reference() {
        Some(r) if r.kind() != expected => Err(mismatch(format!(
            "expected a {} reference, found {}",
            expected.type_name(),
            r.kind().type_name()
        ))),
        _ => Ok(()),
    }
}

/// `external_key_format`: the field text parses as `kind`.
pub fn external_key_format(
    value: &FieldValue<'_>,
    kind: &str,
    parser: &dyn ExternalKeyParser,
) -> Result<(), PredicateFailure> {
    let text = value.as_text().unwrap_or_default();
    parser.parse(kind, &text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagging_core::{AccessLevel, Reference, StandardKeyParser};

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn equals_ignores_case_on_choice_names() {
        let v = FieldValue::Access(AccessLevel::Private);
        assert!(equals(&v, "private").is_ok());
        assert!(equals(&v, "PRIVATE").is_ok());
        assert!(equals(&v, "3").is_ok());
        assert!(equals(&v, "PUBLIC").is_err());
    }

    #[test]
    fn equals_passes_on_empty_field() {
        assert!(equals(&FieldValue::Empty, "x").is_ok());
        assert!(equals(&FieldValue::Text(""), "x").is_ok());
    }

    #[test]
    fn equals_on_reference_uses_type_name() {
        let r = Reference::user("alice");
        assert!(equals(&FieldValue::Reference(&r), "user").is_ok());
        assert!(equals(&FieldValue::Reference(&r), "alice").is_err());
    }

    #[test]
    fn in_set_membership() {
        assert!(in_set(&FieldValue::Text("b"), &set(&["a", "c"])).is_err());
        assert!(in_set(&FieldValue::Text("a"), &set(&["a", "c"])).is_ok());
        assert!(in_set(&FieldValue::Text("A"), &set(&["a", "c"])).is_err());
        assert!(in_set(&FieldValue::Empty, &set(&["a"])).is_err());
    }

    #[test]
    fn exists_requires_non_empty() {
        assert!(exists(&FieldValue::Text("x")).is_ok());
        assert!(exists(&FieldValue::Text("")).is_err());
        assert!(exists(&FieldValue::Empty).is_err());
    }

    #[test]
    fn regex_is_a_search_not_a_full_match() {
        let anchored = Regex::new("^a...s$").unwrap();
        assert!(regex_search(&FieldValue::Text("alias"), &anchored).is_ok());
        assert!(regex_search(&FieldValue::Text("Alias"), &anchored).is_err());

        let inner = Regex::new("li").unwrap();
        assert!(regex_search(&FieldValue::Text("alias"), &inner).is_ok());
        assert!(regex_search(&FieldValue::Empty, &inner).is_err());
    }

    #[test]
    fn object_compares_reference_kind() {
        let owner = Reference::user("bob");
        let v = FieldValue::Reference(&owner);
        assert!(object(&v, ReferenceKind::User).is_ok());
        let err = object(&v, ReferenceKind::Site).unwrap_err();
        assert!(err.to_string().contains("Site"));
        assert!(object(&FieldValue::Empty, ReferenceKind::Site).is_ok());
    }

    #[test]
    fn external_key_format_reports_malformed_key() {
        let parser = StandardKeyParser;
        let good = FieldValue::Text("course-v1:Org+Course+Run");
        assert!(external_key_format(&good, "CourseKey", &parser).is_ok());

        let bad = FieldValue::Text("not a key");
        let err = external_key_format(&bad, "CourseKey", &parser).unwrap_err();
        assert!(matches!(err, PredicateFailure::MalformedKey(_)));
    }

    #[test]
    fn registry_resolves_aliases() {
        let registry = PredicateRegistry::standard();
        assert_eq!(registry.lookup("in"), Some(PredicateKind::In));
        assert_eq!(registry.lookup("opaque_key"), Some(PredicateKind::ExternalKeyFormat));
        assert_eq!(registry.lookup("OpaqueKey"), Some(PredicateKind::ExternalKeyFormat));
        assert_eq!(registry.lookup("frobnicate"), None);
        assert_eq!(registry.lookup("IN"), None);
    }

    #[test]
    fn registry_accepts_extra_aliases() {
        let registry = PredicateRegistry::standard().with_alias("matches", PredicateKind::Regex);
        assert_eq!(registry.lookup("matches"), Some(PredicateKind::Regex));
        assert!(registry.names().contains(&"matches"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn equals_is_case_insensitive(s in "[A-Za-z0-9_]{1,16}") {
                let lower = s.to_lowercase();
                prop_assert!(equals(&FieldValue::Text(&s), &lower).is_ok());
                prop_assert!(equals(&FieldValue::Text(&s), &s.to_uppercase()).is_ok());
            }

            #[test]
            fn in_set_accepts_exactly_members(
                members in proptest::collection::btree_set("[a-z]{1,6}", 1..6),
                probe in "[a-z]{1,6}",
            ) {
                let result = in_set(&FieldValue::Text(&probe), &members);
                prop_assert_eq!(result.is_ok(), members.contains(&probe));
            }

            #[test]
            fn escaped_literal_always_matches_itself(s in ".{1,24}") {
                let pattern = Regex::new(&regex::escape(&s)).unwrap();
                prop_assert!(regex_search(&FieldValue::Text(&s), &pattern).is_ok());
            }
        }
    }
}
