//! Error types for policy loading and the structure check.
//!
//! Loading errors stop the process from starting. Defects are found when a
//! record is compiled; the engine reports them per tag as a malformed
//! policy, and the deployment check collects all of them at once.

use thiserror::Error;

/// Errors raised while reading policy records from configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyLoadError {
    /// The policy source is not valid YAML or has the wrong shape.
    #[error("policy source could not be parsed: {reason}")]
    Parse {
        /// Parser message.
        reason: String,
    },

    /// A record has no `tag_type`.
    #[error("policy record has no tag_type")]
    MissingTagType,

    /// A record key is not a string.
    #[error("policy record for \"{tag_type}\" has a non-string key")]
    NonStringKey {
        /// The record's tag type, or `?` if not yet known.
        tag_type: String,
    },

    /// Two records share a `tag_type`.
    #[error("tag_type \"{tag_type}\" is configured more than once")]
    DuplicateTagType {
        /// The repeated tag type.
        tag_type: String,
    },
}

impl From<serde_yaml::Error> for PolicyLoadError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse {
            reason: e.to_string(),
        }
    }
}

/// A structural problem in one policy record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyDefect {
    /// A clause names a predicate the registry does not know.
    #[error("clause on \"{field}\" uses unknown predicate \"{predicate}\"")]
    UnknownPredicate {
        /// Field the clause targets.
        field: String,
        /// The unknown predicate name.
        predicate: String,
    },

    /// A clause targets an attribute the tag does not have.
    #[error("clause targets unknown field \"{field}\"")]
    UnknownField {
        /// The unknown field name.
        field: String,
    },

    /// Neither `validate_target_object` nor `validate_resource_locator` is present.
    #[error("policy has no target clause (validate_target_object or validate_resource_locator)")]
    MissingTargetClause,

    /// A predicate argument has the wrong shape.
    #[error("clause on \"{field}\" has an invalid {predicate} argument: {reason}")]
    InvalidArgument {
        /// Field the clause targets.
        field: String,
        /// Predicate name.
        predicate: String,
        /// What is wrong.
        reason: String,
    },

    /// A `regex` argument does not compile.
    #[error("clause on \"{field}\" has an invalid pattern \"{pattern}\": {reason}")]
    InvalidRegex {
        /// Field the clause targets.
        field: String,
        /// The pattern text.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// An `object` argument names no known entity type.
    #[error("clause on \"{field}\" names unknown object type \"{kind}\"")]
    UnknownObjectKind {
        /// Field the clause targets.
        field: String,
        /// The unknown type name.
        kind: String,
    },

    /// An `external_key_format` argument names a kind the key parser lacks.
    #[error("clause on \"{field}\" names unsupported key kind \"{kind}\"")]
    UnsupportedKeyKind {
        /// Field the clause targets.
        field: String,
        /// The unsupported key kind.
        kind: String,
    },
}
