//! # Error Types
//!
//! Errors raised while constructing or mutating tag entities. Validation
//! against policy has its own taxonomy in `tagging-engine`; the errors here
//! cover the invariants the entity enforces on itself.

use thiserror::Error;

/// Errors produced by the tag entity and its primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// Neither a target reference nor a resource locator was supplied.
    #[error("a tag needs a target reference or a resource locator")]
    MissingTarget,

    /// The tag type is empty or whitespace.
    #[error("tag_type must be non-empty")]
    EmptyTagType,

    /// The tag was already soft-deleted; `invalidated_at` is set once.
    #[error("tag {key} is already invalidated")]
    AlreadyInvalidated {
        /// The tag key.
        key: String,
    },

    /// A stored record's status disagrees with its `invalidated_at`.
    #[error("tag {key} has inconsistent status {status} for its invalidated_at")]
    InconsistentStatus {
        /// The tag key.
        key: String,
        /// The stored status.
        status: String,
    },

    /// Access level string is not one of PUBLIC, PROTECTED, PRIVATE.
    #[error("invalid access level: \"{0}\" (expected PUBLIC, PROTECTED or PRIVATE)")]
    InvalidAccess(String),

    /// Reference kind name is not recognised.
    #[error("unknown reference kind: \"{0}\"")]
    UnknownReferenceKind(String),

    /// Tag key is not a UUID.
    #[error("invalid tag key: \"{value}\" ({reason})")]
    InvalidKey {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Timestamp text is neither RFC 3339 nor a bare date.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
