//! The backend seam: one existence lookup per entity type.

use async_trait::async_trait;

use crate::entity::{CourseRecord, EnrollmentRecord, SiteRecord, UserRecord};
use crate::error::BackendError;

/// A system of record that can confirm entities exist.
///
/// Each lookup returns `Ok(None)` when the entity is absent and `Err` only
/// when the backend could not answer.
#[async_trait]
pub trait ReferenceBackend: Send + Sync {
    /// Look up a user by username.
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, BackendError>;

    /// Look up a course by course key.
    async fn lookup_course(&self, course_id: &str) -> Result<Option<CourseRecord>, BackendError>;

    /// Look up the enrollment of `username` in `course_id`.
    async fn lookup_enrollment(
        &self,
        username: &str,
        course_id: &str,
    ) -> Result<Option<EnrollmentRecord>, BackendError>;

    /// Look up a site by identifier or domain.
    async fn lookup_site(&self, site_id: &str) -> Result<Option<SiteRecord>, BackendError>;
}
