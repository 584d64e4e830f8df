//! # tagging-resolver: Reference Resolution
//!
//! Confirms that the entities a tag points at exist in the external system
//! of record. The [`ReferenceBackend`] trait is the seam: one lookup per
//! entity type, returning `Ok(None)` for an absent entity. Two backends
//! ship with the crate:
//!
//! - [`InMemoryDirectory`], seeded from YAML fixtures.
//! - [`HttpDirectory`], a `reqwest` client for the directory REST API.
//!
//! [`ReferenceResolver`] wraps a backend, dispatches by reference kind, and
//! bounds each call with a timeout so a slow backend surfaces as
//! [`ResolveError::Unavailable`] instead of blocking validation.

pub mod backend;
pub mod entity;
pub mod error;
pub mod http;
pub mod memory;
pub mod resolver;

pub use backend::ReferenceBackend;
pub use entity::{CourseRecord, EnrollmentRecord, ResolvedEntity, SiteRecord, UserRecord};
pub use error::{BackendError, DirectoryError, ResolveError};
pub use http::{HttpDirectory, HttpDirectoryConfig};
pub use memory::{DirectoryFixtures, InMemoryDirectory};
pub use resolver::{ReferenceResolver, DEFAULT_TIMEOUT};
