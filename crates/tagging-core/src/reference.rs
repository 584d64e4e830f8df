//! # Entity References
//!
//! A tag points at two external entities: the target it annotates and the
//! owner that created it. Both are [`Reference`] values, an enum carrying a
//! typed lookup key per kind. The external system of record is consulted
//! through the resolver crate; this module only describes the pointers.
//!
//! ## Proxy Locators
//!
//! Some targets have no entity class of their own and are addressed by an
//! opaque external locator (e.g. a course key string). Those are wrapped in
//! [`Reference::ProxyLocator`], which holds the key and nothing else. A
//! proxy has no [`EntityType`] and is never resolved against a backend.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TagError;

/// Entity types that have a backing system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A platform user, looked up by username.
    User,
    /// A course, looked up by course key.
    Course,
    /// A user's enrollment in a course.
    Enrollment,
    /// A site (tenant), looked up by site identifier.
    Site,
}

impl EntityType {
    /// All resolvable entity types.
    pub fn all() -> &'static [EntityType] {
        &[Self::User, Self::Course, Self::Enrollment, Self::Site]
    }

    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Course => "course",
            Self::Enrollment => "enrollment",
            Self::Site => "site",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator of a [`Reference`], including the locator proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// See [`EntityType::User`].
    User,
    /// See [`EntityType::Course`].
    Course,
    /// See [`EntityType::Enrollment`].
    Enrollment,
    /// See [`EntityType::Site`].
    Site,
    /// Minimal proxy wrapping an external locator string.
    ProxyLocator,
}

impl ReferenceKind {
    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Course => "course",
            Self::Enrollment => "enrollment",
            Self::Site => "site",
            Self::ProxyLocator => "proxy_locator",
        }
    }

    /// The display type name, compared by the `object` and `equals` predicates.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Course => "Course",
            Self::Enrollment => "Enrollment",
            Self::Site => "Site",
            Self::ProxyLocator => "OpaqueKeyProxy",
        }
    }

    /// Look up a kind by any of its accepted names.
    ///
    /// Matching ignores case, `_` and `-`. Besides the canonical names,
    /// `CourseOverview`, `CourseEnrollment` and `OpaqueKeyProxyModel` are
    /// accepted so existing deployment configuration keeps working.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "user" => Some(Self::User),
            "course" | "courseoverview" => Some(Self::Course),
            "enrollment" | "courseenrollment" => Some(Self::Enrollment),
            "site" => Some(Self::Site),
            "proxylocator" | "opaquekeyproxy" | "opaquekeyproxymodel" => Some(Self::ProxyLocator),
            _ => None,
        }
    }

    /// The backing entity type, or `None` for the locator proxy.
    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::User => Some(EntityType::User),
            Self::Course => Some(EntityType::Course),
            Self::Enrollment => Some(EntityType::Enrollment),
            Self::Site => Some(EntityType::Site),
            Self::ProxyLocator => None,
        }
    }
}

impl From<EntityType> for ReferenceKind {
    fn from(t: EntityType) -> Self {
        match t {
            EntityType::User => Self::User,
            EntityType::Course => Self::Course,
            EntityType::Enrollment => Self::Enrollment,
            EntityType::Site => Self::Site,
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| TagError::UnknownReferenceKind(s.to_string()))
    }
}

/// A typed pointer to an external entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reference {
    /// A user by username.
    User {
        /// Username in the user directory.
        username: String,
    },
    /// A course by course key.
    Course {
        /// Course key text, e.g. `course-v1:Org+Course+Run`.
        course_id: String,
    },
    /// An enrollment of a user in a course.
    Enrollment {
        /// Enrolled username.
        username: String,
        /// Course key text.
        course_id: String,
    },
    /// A site by identifier.
    Site {
        /// Site identifier (numeric id or domain).
        site_id: String,
    },
    /// A bare external locator wrapped so it can stand in as a target.
    ProxyLocator {
        /// The opaque locator text.
        locator: String,
    },
}

impl Reference {
    /// Reference a user.
    pub fn user(username: impl Into<String>) -> Self {
        Self::User {
            username: username.into(),
        }
    }

    /// Reference a course.
    pub fn course(course_id: impl Into<String>) -> Self {
        Self::Course {
            course_id: course_id.into(),
        }
    }

    /// Reference an enrollment.
    pub fn enrollment(username: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self::Enrollment {
            username: username.into(),
            course_id: course_id.into(),
        }
    }

    /// Reference a site.
    pub fn site(site_id: impl Into<String>) -> Self {
        Self::Site {
            site_id: site_id.into(),
        }
    }

    /// Wrap an external locator.
    pub fn proxy(locator: impl Into<String>) -> Self {
        Self::ProxyLocator {
            locator: locator.into(),
        }
    }

    /// The kind of this reference.
    pub fn kind(&self) -> ReferenceKind {
        match self {
            Self::User { .. } => ReferenceKind::User,
            Self::Course { .. } => ReferenceKind::Course,
            Self::Enrollment { .. } => ReferenceKind::Enrollment,
            Self::Site { .. } => ReferenceKind::Site,
            Self::ProxyLocator { .. } => ReferenceKind::ProxyLocator,
        }
    }

    /// The declared entity type, or `None` when nothing can be resolved.
    pub fn entity_type(&self) -> Option<EntityType> {
        self.kind().entity_type()
    }

    /// The lookup key as text. Enrollments join username and course key
    /// with `::`.
    pub fn lookup_key(&self) -> String {
        match self {
            Self::User { username } => username.clone(),
            Self::Course { course_id } => course_id.clone(),
            Self::Enrollment {
                username,
                course_id,
            } => format!("{username}::{course_id}"),
            Self::Site { site_id } => site_id.clone(),
            Self::ProxyLocator { locator } => locator.clone(),
        }
    }

    /// The wrapped locator if this is a proxy.
    pub fn locator(&self) -> Option<&str> {
        match self {
            Self::ProxyLocator { locator } => Some(locator),
            _ => None,
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.lookup_key())
    }
}

/// Which side of the tag a reference sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceRole {
    /// The tagged entity.
    Target,
    /// The entity that owns the tag.
    Owner,
}

impl ReferenceRole {
    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Owner => "owner",
        }
    }
}

impl std::fmt::Display for ReferenceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_accept_aliases() {
        assert_eq!(ReferenceKind::from_name("User"), Some(ReferenceKind::User));
        assert_eq!(ReferenceKind::from_name("site"), Some(ReferenceKind::Site));
        assert_eq!(
            ReferenceKind::from_name("CourseOverview"),
            Some(ReferenceKind::Course)
        );
        assert_eq!(
            ReferenceKind::from_name("course_enrollment"),
            Some(ReferenceKind::Enrollment)
        );
        assert_eq!(
            ReferenceKind::from_name("OpaqueKeyProxyModel"),
            Some(ReferenceKind::ProxyLocator)
        );
        assert_eq!(ReferenceKind::from_name("Organization"), None);
    }

    #[test]
    fn kind_from_str_reports_unknown() {
        let err = "badge".parse::<ReferenceKind>().unwrap_err();
        assert_eq!(err, TagError::UnknownReferenceKind("badge".to_string()));
    }

    #[test]
    fn proxy_has_no_entity_type() {
        let r = Reference::proxy("course-v1:Org+Course+Run");
        assert_eq!(r.entity_type(), None);
        assert_eq!(r.locator(), Some("course-v1:Org+Course+Run"));
    }

    #[test]
    fn entity_type_round_trips_through_kind() {
        for t in EntityType::all() {
            assert_eq!(ReferenceKind::from(*t).entity_type(), Some(*t));
        }
    }

    #[test]
    fn enrollment_lookup_key_joins_parts() {
        let r = Reference::enrollment("alice", "course-v1:Org+C+R");
        assert_eq!(r.lookup_key(), "alice::course-v1:Org+C+R");
        assert_eq!(r.to_string(), "enrollment:alice::course-v1:Org+C+R");
    }

    #[test]
    fn reference_serde_is_internally_tagged() {
        let json = serde_json::to_value(Reference::user("alice")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "user", "username": "alice"}));
        let back: Reference =
            serde_json::from_value(serde_json::json!({"type": "site", "site_id": "1"})).unwrap();
        assert_eq!(back, Reference::site("1"));
    }
}
