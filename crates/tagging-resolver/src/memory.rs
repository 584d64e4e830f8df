//! # In-Memory Directory
//!
//! A [`ReferenceBackend`] over records held in memory, seeded from a YAML
//! fixture document:
//!
//! ```yaml
//! users:
//!   - username: alice
//! courses:
//!   - course_id: course-v1:Org+Course+Run
//! enrollments:
//!   - username: alice
//!     course_id: course-v1:Org+Course+Run
//! sites:
//!   - id: "1"
//!     domain: example.com
//! ```
//!
//! Used for local development, the CLI's `validate` command, and tests.
//! Sites match on either `id` or `domain`.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::backend::ReferenceBackend;
use crate::entity::{CourseRecord, EnrollmentRecord, SiteRecord, UserRecord};
use crate::error::{BackendError, DirectoryError};

/// Fixture document shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryFixtures {
    /// Users.
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Courses.
    #[serde(default)]
    pub courses: Vec<CourseRecord>,
    /// Enrollments.
    #[serde(default)]
    pub enrollments: Vec<EnrollmentRecord>,
    /// Sites.
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
}

#[derive(Debug, Default)]
struct Records {
    users: HashMap<String, UserRecord>,
    courses: HashMap<String, CourseRecord>,
    enrollments: HashMap<(String, String), EnrollmentRecord>,
    sites: Vec<SiteRecord>,
}

/// Thread-safe in-memory directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: RwLock<Records>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from parsed fixtures.
    pub fn from_fixtures(fixtures: DirectoryFixtures) -> Self {
        let dir = Self::new();
        for user in fixtures.users {
            dir.insert_user(user);
        }
        for course in fixtures.courses {
            dir.insert_course(course);
        }
        for enrollment in fixtures.enrollments {
            dir.insert_enrollment(enrollment);
        }
        for site in fixtures.sites {
            dir.insert_site(site);
        }
        dir
    }

    /// Seed from a YAML fixture document.
    pub fn from_yaml_str(source: &str) -> Result<Self, DirectoryError> {
        let fixtures: DirectoryFixtures = serde_yaml::from_str(source)?;
        Ok(Self::from_fixtures(fixtures))
    }

    /// Seed from a YAML fixture file.
    pub fn from_path(path: &Path) -> Result<Self, DirectoryError> {
        let source = std::fs::read_to_string(path).map_err(|e| DirectoryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Add or replace a user.
    pub fn insert_user(&self, user: UserRecord) {
        self.records.write().users.insert(user.username.clone(), user);
    }

    /// Add or replace a course.
    pub fn insert_course(&self, course: CourseRecord) {
        self.records
            .write()
            .courses
            .insert(course.course_id.clone(), course);
    }

    /// Add or replace an enrollment.
    pub fn insert_enrollment(&self, enrollment: EnrollmentRecord) {
        let key = (enrollment.username.clone(), enrollment.course_id.clone());
        self.records.write().enrollments.insert(key, enrollment);
    }

    /// Add or replace a site.
    pub fn insert_site(&self, site: SiteRecord) {
        let mut records = self.records.write();
        records.sites.retain(|s| s.id != site.id);
        records.sites.push(site);
    }

    /// Total number of records of every type.
    pub fn len(&self) -> usize {
        let r = self.records.read();
        r.users.len() + r.courses.len() + r.enrollments.len() + r.sites.len()
    }

    /// Whether the directory holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReferenceBackend for InMemoryDirectory {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, BackendError> {
        Ok(self.records.read().users.get(username).cloned())
    }

    async fn lookup_course(&self, course_id: &str) -> Result<Option<CourseRecord>, BackendError> {
        Ok(self.records.read().courses.get(course_id).cloned())
    }

    async fn lookup_enrollment(
        &self,
        username: &str,
        course_id: &str,
    ) -> Result<Option<EnrollmentRecord>, BackendError> {
        let key = (username.to_string(), course_id.to_string());
        Ok(self.records.read().enrollments.get(&key).cloned())
    }

    async fn lookup_site(&self, site_id: &str) -> Result<Option<SiteRecord>, BackendError> {
        Ok(self
            .records
            .read()
            .sites
            .iter()
            .find(|s| s.id == site_id || s.domain.as_deref() == Some(site_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &str = r#"
users:
  - username: alice
  - username: bob
    email: bob@example.com
courses:
  - course_id: course-v1:Org+Course+Run
enrollments:
  - username: alice
    course_id: course-v1:Org+Course+Run
    mode: audit
sites:
  - id: "1"
    domain: example.com
"#;

    #[tokio::test]
    async fn seeded_records_are_found() {
        let dir = InMemoryDirectory::from_yaml_str(FIXTURES).unwrap();
        assert_eq!(dir.len(), 5);
        assert!(dir.lookup_user("alice").await.unwrap().is_some());
        assert!(dir.lookup_user("carol").await.unwrap().is_none());
        assert!(dir
            .lookup_course("course-v1:Org+Course+Run")
            .await
            .unwrap()
            .is_some());
        assert!(dir
            .lookup_enrollment("alice", "course-v1:Org+Course+Run")
            .await
            .unwrap()
            .is_some());
        assert!(dir
            .lookup_enrollment("bob", "course-v1:Org+Course+Run")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn sites_match_id_or_domain() {
        let dir = InMemoryDirectory::from_yaml_str(FIXTURES).unwrap();
        assert!(dir.lookup_site("1").await.unwrap().is_some());
        assert!(dir.lookup_site("example.com").await.unwrap().is_some());
        assert!(dir.lookup_site("2").await.unwrap().is_none());
    }

    #[test]
    fn insert_site_replaces_same_id() {
        let dir = InMemoryDirectory::new();
        dir.insert_site(SiteRecord {
            id: "1".into(),
            domain: None,
            name: None,
        });
        dir.insert_site(SiteRecord {
            id: "1".into(),
            domain: Some("example.org".into()),
            name: None,
        });
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn loads_fixture_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), FIXTURES).unwrap();
        let dir = InMemoryDirectory::from_path(file.path()).unwrap();
        assert!(!dir.is_empty());
    }

    #[test]
    fn missing_fixture_file_is_io_error() {
        let err = InMemoryDirectory::from_path(Path::new("/nonexistent/fixtures.yaml")).unwrap_err();
        assert!(matches!(err, DirectoryError::Io { .. }));
    }
}
