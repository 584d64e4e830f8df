//! # tagging-core: Foundational Types for the Tag Stack
//!
//! This crate defines the data model every other crate in the workspace
//! builds on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** A tag is addressed only by its [`TagKey`],
//!    a UUID assigned at creation. No bare strings for keys.
//!
//! 2. **Polymorphic references as an enum.** Targets and owners are
//!    [`Reference`] values carrying a typed lookup key per kind
//!    (user, course, enrollment, site, or a proxy holding an external
//!    locator). There is no runtime content-type registry.
//!
//! 3. **Derived status.** [`TagStatus`] is never set by callers; it follows
//!    `invalidated_at` so the two cannot disagree.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tagging-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod access;
pub mod error;
pub mod external_key;
pub mod identity;
pub mod reference;
pub mod tag;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use access::{AccessLevel, TagStatus};
pub use error::TagError;
pub use external_key::{
    CourseKey, ExternalKey, ExternalKeyError, ExternalKeyParser, StandardKeyParser, UsageKey,
};
pub use identity::TagKey;
pub use reference::{EntityType, Reference, ReferenceKind, ReferenceRole};
pub use tag::{FieldValue, Tag, TagDraft, TagField, TargetSpec};
pub use temporal::Timestamp;
