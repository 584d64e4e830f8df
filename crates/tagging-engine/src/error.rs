//! # Rejections and Service Errors
//!
//! [`Rejection`] is the engine's verdict when a candidate tag fails. Each
//! kind carries enough structure for a caller to report which field,
//! predicate, or reference role was at fault. Domain failures keep
//! distinct kinds; only transport failures and timeouts collapse into
//! [`Rejection::ResolverUnavailable`].

use tagging_core::{EntityType, ExternalKeyError, ReferenceRole, TagError, TagField, TagKey};
use tagging_policy::{PolicyDefect, PredicateKind};
use thiserror::Error;

/// Why a candidate tag was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No policy is configured for the tag type.
    #[error("no policy is configured for tag_type \"{tag_type}\"")]
    UnconfiguredTagType {
        /// The unconfigured tag type.
        tag_type: String,
    },

    /// The tag type's policy failed the structure check.
    #[error("policy for tag_type \"{tag_type}\" is malformed: {defect}")]
    MalformedPolicy {
        /// The tag type.
        tag_type: String,
        /// The first defect found.
        defect: PolicyDefect,
    },

    /// The candidate is already persisted; tags cannot be updated.
    #[error("tag {key} is already persisted and cannot be updated")]
    ImmutableTagUpdate {
        /// Key of the persisted tag.
        key: TagKey,
    },

    /// A field clause failed.
    #[error("field \"{field}\" failed {predicate}: {reason}")]
    FieldValidationFailed {
        /// The field checked.
        field: TagField,
        /// The predicate that failed.
        predicate: PredicateKind,
        /// Predicate detail.
        reason: String,
    },

    /// A field does not parse as the required external key kind.
    #[error("field \"{field}\" is not a valid external key: {error}")]
    MalformedExternalKey {
        /// The field checked.
        field: TagField,
        /// Parser detail.
        error: ExternalKeyError,
    },

    /// A target or owner reference does not resolve.
    #[error("{role} {entity_type} reference failed: {reason}")]
    ReferenceIntegrityFailed {
        /// Target or owner.
        role: ReferenceRole,
        /// Declared entity type.
        entity_type: EntityType,
        /// Resolver detail.
        reason: String,
    },

    /// The resolver could not answer in time.
    #[error("resolver unavailable for {role} {entity_type}: {reason}")]
    ResolverUnavailable {
        /// Target or owner.
        role: ReferenceRole,
        /// Declared entity type.
        entity_type: EntityType,
        /// Transport or timeout detail.
        reason: String,
    },

    /// The reference names a type with no resolver backend.
    #[error("{role} reference type \"{kind}\" has no resolver backend")]
    UnsupportedEntityType {
        /// Target or owner.
        role: ReferenceRole,
        /// The unsupported type name.
        kind: String,
    },
}

impl Rejection {
    /// Stable identifier for the rejection kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnconfiguredTagType { .. } => "unconfigured_tag_type",
            Self::MalformedPolicy { .. } => "malformed_policy",
            Self::ImmutableTagUpdate { .. } => "immutable_tag_update",
            Self::FieldValidationFailed { .. } => "field_validation_failed",
            Self::MalformedExternalKey { .. } => "malformed_external_key",
            Self::ReferenceIntegrityFailed { .. } => "reference_integrity_failed",
            Self::ResolverUnavailable { .. } => "resolver_unavailable",
            Self::UnsupportedEntityType { .. } => "unsupported_entity_type",
        }
    }
}

/// Tag storage failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A tag with this key is already stored.
    #[error("tag {key} already exists")]
    DuplicateKey {
        /// The repeated key.
        key: TagKey,
    },

    /// The tag has neither a target reference nor a resource locator.
    #[error("tag {key} has no target")]
    MissingTarget {
        /// The tag key.
        key: TagKey,
    },

    /// No tag with this key is stored.
    #[error("tag {key} not found")]
    NotFound {
        /// The missing key.
        key: TagKey,
    },

    /// The tag was already soft-deleted.
    #[error("tag {key} is already invalidated")]
    AlreadyInvalidated {
        /// The tag key.
        key: TagKey,
    },

    /// The storage backend failed.
    #[error("tag store failure: {0}")]
    Backend(String),
}

/// Errors from the lifecycle service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The engine rejected the candidate.
    #[error("tag rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The candidate could not be built.
    #[error("invalid tag: {0}")]
    InvalidTag(#[from] TagError),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// The rejection, if the engine produced one.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }
}
