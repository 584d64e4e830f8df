//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tagging_core::EntityType;
use tagging_engine::{build_service, InMemoryTagStore, TagService, TaggingConfig};
use tagging_resolver::{
    BackendError, CourseRecord, EnrollmentRecord, InMemoryDirectory, ReferenceBackend, SiteRecord,
    UserRecord,
};

pub const CONFIG: &str = r#"
tag_definitions:
  - tag_type: example_tag_1
    validate_tag_value:
      in: [v1, v2]
    validate_target_object: User
    validate_owner_object: User
  - tag_type: site_owned
    validate_tag_value:
      exists: true
    validate_target_object: User
  - tag_type: site_only
    validate_target_object: User
    validate_owner_object:
      object: site
  - tag_type: course_label
    validate_resource_locator:
      external_key_format: CourseKey
  - tag_type: broken
    validate_tag_value:
      frobnicate: x
    validate_target_object: User
  - tag_type: alias_pattern
    validate_tag_value:
      regex: '^a...s$'
    validate_target_object: User
    validate_owner_object: User
resolver:
  timeout_ms: 500
default_site: "1"
"#;

pub const FIXTURES: &str = r#"
users:
  - username: alice
  - username: bob
courses:
  - course_id: course-v1:Org+Course+Run
sites:
  - id: "1"
    domain: example.com
"#;

pub fn config() -> TaggingConfig {
    TaggingConfig::from_yaml_str(CONFIG).unwrap()
}

pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::from_yaml_str(FIXTURES).unwrap()
}

pub fn service() -> TagService {
    build_service(
        &config(),
        Arc::new(directory()),
        Arc::new(InMemoryTagStore::new()),
    )
}

/// Backend that counts lookups before delegating.
pub struct CountingBackend {
    inner: InMemoryDirectory,
    calls: AtomicUsize,
}

impl CountingBackend {
    pub fn new(inner: InMemoryDirectory) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReferenceBackend for CountingBackend {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, BackendError> {
        self.hit();
        self.inner.lookup_user(username).await
    }

    async fn lookup_course(&self, course_id: &str) -> Result<Option<CourseRecord>, BackendError> {
        self.hit();
        self.inner.lookup_course(course_id).await
    }

    async fn lookup_enrollment(
        &self,
        username: &str,
        course_id: &str,
    ) -> Result<Option<EnrollmentRecord>, BackendError> {
        self.hit();
        self.inner.lookup_enrollment(username, course_id).await
    }

    async fn lookup_site(&self, site_id: &str) -> Result<Option<SiteRecord>, BackendError> {
        self.hit();
        self.inner.lookup_site(site_id).await
    }
}

/// How [`UnreachableBackend`] fails.
#[derive(Debug, Clone, Copy)]
pub enum Outage {
    /// Never answers within any reasonable timeout.
    Stall(Duration),
    /// Answers immediately with a transport error.
    Down,
}

/// Backend that fails lookups of one entity type and delegates the rest.
pub struct UnreachableBackend {
    inner: InMemoryDirectory,
    failing: EntityType,
    outage: Outage,
}

impl UnreachableBackend {
    pub fn new(inner: InMemoryDirectory, failing: EntityType, outage: Outage) -> Self {
        Self {
            inner,
            failing,
            outage,
        }
    }

    async fn fail_if(&self, entity_type: EntityType) -> Result<(), BackendError> {
        if entity_type != self.failing {
            return Ok(());
        }
        match self.outage {
            Outage::Stall(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
            Outage::Down => Err(BackendError::Unavailable("connection refused".into())),
        }
    }
}

#[async_trait]
impl ReferenceBackend for UnreachableBackend {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, BackendError> {
        self.fail_if(EntityType::User).await?;
        self.inner.lookup_user(username).await
    }

    async fn lookup_course(&self, course_id: &str) -> Result<Option<CourseRecord>, BackendError> {
        self.fail_if(EntityType::Course).await?;
        self.inner.lookup_course(course_id).await
    }

    async fn lookup_enrollment(
        &self,
        username: &str,
        course_id: &str,
    ) -> Result<Option<EnrollmentRecord>, BackendError> {
        self.fail_if(EntityType::Enrollment).await?;
        self.inner.lookup_enrollment(username, course_id).await
    }

    async fn lookup_site(&self, site_id: &str) -> Result<Option<SiteRecord>, BackendError> {
        self.fail_if(EntityType::Site).await?;
        self.inner.lookup_site(site_id).await
    }
}
