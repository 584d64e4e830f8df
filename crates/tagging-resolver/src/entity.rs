//! Directory records returned by backends.
//!
//! Only the fields the tag stack needs are modelled. Unknown fields in
//! directory responses are ignored so schema additions upstream do not
//! break resolution.

use serde::{Deserialize, Serialize};
use tagging_core::EntityType;

fn active() -> bool {
    true
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Username.
    pub username: String,
    /// Contact address, if the directory exposes it.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the account is active.
    #[serde(default = "active")]
    pub is_active: bool,
}

/// A course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course key text.
    pub course_id: String,
    /// Human-readable title.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A user's enrollment in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    /// Enrolled username.
    pub username: String,
    /// Course key text.
    pub course_id: String,
    /// Enrollment mode, e.g. `audit` or `verified`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Whether the enrollment is active.
    #[serde(default = "active")]
    pub is_active: bool,
}

/// A site (tenant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Site identifier.
    pub id: String,
    /// Primary domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A confirmed external entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum ResolvedEntity {
    /// A user.
    User(UserRecord),
    /// A course.
    Course(CourseRecord),
    /// An enrollment.
    Enrollment(EnrollmentRecord),
    /// A site.
    Site(SiteRecord),
}

impl ResolvedEntity {
    /// The entity type of the resolved record.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::User(_) => EntityType::User,
            Self::Course(_) => EntityType::Course,
            Self::Enrollment(_) => EntityType::Enrollment,
            Self::Site(_) => EntityType::Site,
        }
    }

    /// The key the record was found under.
    pub fn lookup_key(&self) -> String {
        match self {
            Self::User(u) => u.username.clone(),
            Self::Course(c) => c.course_id.clone(),
            Self::Enrollment(e) => format!("{}::{}", e.username, e.course_id),
            Self::Site(s) => s.id.clone(),
        }
    }
}
