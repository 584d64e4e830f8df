//! # Tag Entity
//!
//! A tag links a `(tag_type, tag_value)` pair to a target entity and an
//! owning entity. Tags are append-only: once persisted, the record is never
//! updated. The only later change is soft deletion, which sets
//! `invalidated_at` once and flips the derived status to `INVALID`.
//!
//! ## Construction
//!
//! Callers fill a [`TagDraft`] and call [`TagDraft::build()`], which assigns
//! the key and `created_at` and checks the entity-level invariants:
//!
//! - `tag_type` is non-empty.
//! - A target reference or a resource locator is present. A bare locator is
//!   wrapped in [`Reference::ProxyLocator`] so it can stand in as the target.
//!
//! Policy validation happens afterwards in the engine; a built tag is only a
//! candidate until the storage collaborator marks it persisted.
//!
//! ## Field Access
//!
//! Policies address tag attributes by name. [`TagField`] is the closed set of
//! those names and [`Tag::field()`] returns a [`FieldValue`] view, so an
//! unknown name is caught when the policy is compiled, not per tag.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::access::{AccessLevel, TagStatus};
use crate::error::TagError;
use crate::identity::TagKey;
use crate::reference::Reference;
use crate::temporal::Timestamp;

/// How the caller designates the tagged entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    /// A resolvable entity reference.
    Entity(Reference),
    /// A bare external locator with no entity class of its own.
    Locator(String),
}

/// Caller-supplied fields of a tag that has not been built yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDraft {
    /// Policy selector.
    pub tag_type: String,
    /// The value being attached.
    #[serde(default)]
    pub tag_value: String,
    /// Visibility.
    #[serde(default)]
    pub access: AccessLevel,
    /// Start of the validity window.
    #[serde(default)]
    pub activation_date: Option<Timestamp>,
    /// End of the validity window.
    #[serde(default)]
    pub expiration_date: Option<Timestamp>,
    /// The tagged entity.
    #[serde(default)]
    pub target: Option<TargetSpec>,
    /// The owning entity.
    #[serde(default)]
    pub owner: Option<Reference>,
}

impl TagDraft {
    /// Start a draft with the given type and value.
    pub fn new(tag_type: impl Into<String>, tag_value: impl Into<String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            tag_value: tag_value.into(),
            access: AccessLevel::default(),
            activation_date: None,
            expiration_date: None,
            target: None,
            owner: None,
        }
    }

    /// Set the access level.
    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    /// Target an entity reference.
    pub fn with_target(mut self, target: Reference) -> Self {
        self.target = Some(TargetSpec::Entity(target));
        self
    }

    /// Target a bare external locator.
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.target = Some(TargetSpec::Locator(locator.into()));
        self
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner: Reference) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the activation date.
    pub fn with_activation_date(mut self, at: Timestamp) -> Self {
        self.activation_date = Some(at);
        self
    }

    /// Set the expiration date.
    pub fn with_expiration_date(mut self, at: Timestamp) -> Self {
        self.expiration_date = Some(at);
        self
    }

    /// Assign identity and timestamps, enforcing entity invariants.
    ///
    /// # Errors
    ///
    /// [`TagError::EmptyTagType`] if `tag_type` is blank,
    /// [`TagError::MissingTarget`] if there is no target or the locator is blank.
    pub fn build(self) -> Result<Tag, TagError> {
        if self.tag_type.trim().is_empty() {
            return Err(TagError::EmptyTagType);
        }

        let (target, resource_locator) = match self.target {
            Some(TargetSpec::Locator(locator))
            | Some(TargetSpec::Entity(Reference::ProxyLocator { locator })) => {
                if locator.trim().is_empty() {
                    return Err(TagError::MissingTarget);
                }
                (Some(Reference::proxy(locator.clone())), Some(locator))
            }
            Some(TargetSpec::Entity(reference)) => (Some(reference), None),
            None => return Err(TagError::MissingTarget),
        };

        Ok(Tag {
            key: TagKey::new(),
            tag_value: self.tag_value,
            tag_type: self.tag_type,
            access: self.access,
            activation_date: self.activation_date,
            expiration_date: self.expiration_date,
            created_at: Timestamp::now(),
            invalidated_at: None,
            target,
            resource_locator,
            owner: self.owner,
            persisted: false,
        })
    }
}

/// An immutable, soft-deletable tag record.
///
/// Serialized records carry `status` for readers, but it is derived: loading
/// a record whose `status` disagrees with `invalidated_at` fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TagRecord", into = "TagRecord")]
pub struct Tag {
    key: TagKey,
    /// The value attached by this tag.
    pub tag_value: String,
    /// Policy selector.
    pub tag_type: String,
    /// Visibility.
    pub access: AccessLevel,
    /// Start of the validity window.
    pub activation_date: Option<Timestamp>,
    /// End of the validity window.
    pub expiration_date: Option<Timestamp>,
    created_at: Timestamp,
    invalidated_at: Option<Timestamp>,
    target: Option<Reference>,
    resource_locator: Option<String>,
    owner: Option<Reference>,
    persisted: bool,
}

/// Wire form of [`Tag`].
#[derive(Serialize, Deserialize)]
struct TagRecord {
    key: TagKey,
    tag_value: String,
    tag_type: String,
    access: AccessLevel,
    activation_date: Option<Timestamp>,
    expiration_date: Option<Timestamp>,
    status: TagStatus,
    created_at: Timestamp,
    invalidated_at: Option<Timestamp>,
    target: Option<Reference>,
    resource_locator: Option<String>,
    owner: Option<Reference>,
}

impl From<Tag> for TagRecord {
    fn from(tag: Tag) -> Self {
        Self {
            status: tag.status(),
            key: tag.key,
            tag_value: tag.tag_value,
            tag_type: tag.tag_type,
            access: tag.access,
            activation_date: tag.activation_date,
            expiration_date: tag.expiration_date,
            created_at: tag.created_at,
            invalidated_at: tag.invalidated_at,
            target: tag.target,
            resource_locator: tag.resource_locator,
            owner: tag.owner,
        }
    }
}

impl TryFrom<TagRecord> for Tag {
    type Error = TagError;

    fn try_from(record: TagRecord) -> Result<Self, Self::Error> {
        let derived = status_of(record.invalidated_at);
        if record.status != derived {
            return Err(TagError::InconsistentStatus {
                key: record.key.to_string(),
                status: record.status.to_string(),
            });
        }
        if record.target.is_none() && record.resource_locator.is_none() {
            return Err(TagError::MissingTarget);
        }
        Ok(Self {
            key: record.key,
            tag_value: record.tag_value,
            tag_type: record.tag_type,
            access: record.access,
            activation_date: record.activation_date,
            expiration_date: record.expiration_date,
            created_at: record.created_at,
            invalidated_at: record.invalidated_at,
            target: record.target,
            resource_locator: record.resource_locator,
            owner: record.owner,
            persisted: false,
        })
    }
}

fn status_of(invalidated_at: Option<Timestamp>) -> TagStatus {
    match invalidated_at {
        Some(_) => TagStatus::Invalid,
        None => TagStatus::Valid,
    }
}

impl Tag {
    /// The tag key.
    pub fn key(&self) -> TagKey {
        self.key
    }

    /// Derived status.
    pub fn status(&self) -> TagStatus {
        status_of(self.invalidated_at)
    }

    /// Creation time.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Soft-deletion time, if invalidated.
    pub fn invalidated_at(&self) -> Option<Timestamp> {
        self.invalidated_at
    }

    /// The target reference (a proxy when the target is a bare locator).
    pub fn target(&self) -> Option<&Reference> {
        self.target.as_ref()
    }

    /// The bare external locator, if the target was given as one.
    pub fn resource_locator(&self) -> Option<&str> {
        self.resource_locator.as_deref()
    }

    /// The owner reference.
    pub fn owner(&self) -> Option<&Reference> {
        self.owner.as_ref()
    }

    /// `true` until the tag is soft-deleted.
    pub fn is_valid(&self) -> bool {
        self.invalidated_at.is_none()
    }

    /// Whether the storage collaborator has persisted this tag.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Mark the tag as persisted. Called by storage implementations after a
    /// successful insert or when loading a stored record.
    pub fn into_persisted(mut self) -> Self {
        self.persisted = true;
        self
    }

    /// Soft-delete at `at`.
    ///
    /// # Errors
    ///
    /// [`TagError::AlreadyInvalidated`] if `invalidated_at` is already set.
    pub fn invalidate_at(&mut self, at: Timestamp) -> Result<(), TagError> {
        if self.invalidated_at.is_some() {
            return Err(TagError::AlreadyInvalidated {
                key: self.key.to_string(),
            });
        }
        self.invalidated_at = Some(at);
        Ok(())
    }

    /// Read a field by name for policy evaluation.
    pub fn field(&self, field: TagField) -> FieldValue<'_> {
        match field {
            TagField::Key => FieldValue::Key(self.key),
            TagField::TagValue => FieldValue::text(&self.tag_value),
            TagField::TagType => FieldValue::text(&self.tag_type),
            TagField::Access => FieldValue::Access(self.access),
            TagField::ActivationDate => self.activation_date.map_or(FieldValue::Empty, FieldValue::Time),
            TagField::ExpirationDate => self.expiration_date.map_or(FieldValue::Empty, FieldValue::Time),
            TagField::Status => FieldValue::Status(self.status()),
            TagField::CreatedAt => FieldValue::Time(self.created_at),
            TagField::InvalidatedAt => self.invalidated_at.map_or(FieldValue::Empty, FieldValue::Time),
            TagField::TargetObject => self.target.as_ref().map_or(FieldValue::Empty, FieldValue::Reference),
            TagField::OwnerObject => self.owner.as_ref().map_or(FieldValue::Empty, FieldValue::Reference),
            TagField::ResourceLocator => self
                .resource_locator
                .as_deref()
                .map_or(FieldValue::Empty, FieldValue::text),
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tag_value)
    }
}

/// Attributes of the tag shape that policies may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagField {
    /// `key`
    Key,
    /// `tag_value`
    TagValue,
    /// `tag_type`
    TagType,
    /// `access`
    Access,
    /// `activation_date`
    ActivationDate,
    /// `expiration_date`
    ExpirationDate,
    /// `status`
    Status,
    /// `created_at`
    CreatedAt,
    /// `invalidated_at`
    InvalidatedAt,
    /// `target_object`
    TargetObject,
    /// `owner_object`
    OwnerObject,
    /// `resource_locator`
    ResourceLocator,
}

impl TagField {
    /// Every addressable field.
    pub fn all() -> &'static [TagField] {
        &[
            Self::Key,
            Self::TagValue,
            Self::TagType,
            Self::Access,
            Self::ActivationDate,
            Self::ExpirationDate,
            Self::Status,
            Self::CreatedAt,
            Self::InvalidatedAt,
            Self::TargetObject,
            Self::OwnerObject,
            Self::ResourceLocator,
        ]
    }

    /// The attribute name as written in policies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::TagValue => "tag_value",
            Self::TagType => "tag_type",
            Self::Access => "access",
            Self::ActivationDate => "activation_date",
            Self::ExpirationDate => "expiration_date",
            Self::Status => "status",
            Self::CreatedAt => "created_at",
            Self::InvalidatedAt => "invalidated_at",
            Self::TargetObject => "target_object",
            Self::OwnerObject => "owner_object",
            Self::ResourceLocator => "resource_locator",
        }
    }

    /// Whether the field holds an entity reference.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::TargetObject | Self::OwnerObject)
    }
}

impl std::fmt::Display for TagField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("tag has no field named \"{s}\""))
    }
}

/// A borrowed view of one tag field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Null.
    Empty,
    /// Free text.
    Text(&'a str),
    /// An access level.
    Access(AccessLevel),
    /// The derived status.
    Status(TagStatus),
    /// A timestamp.
    Time(Timestamp),
    /// The tag key.
    Key(TagKey),
    /// An entity reference.
    Reference(&'a Reference),
}

impl<'a> FieldValue<'a> {
    fn text(s: &'a str) -> Self {
        Self::Text(s)
    }

    /// Null or empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// The display or choice name: access and status names, the type name of
    /// a reference, otherwise the value as text.
    pub fn display_name(&self) -> Option<String> {
        match self {
            Self::Reference(r) => Some(r.kind().type_name().to_string()),
            _ => self.as_text(),
        }
    }

    /// The value as text. References render as their lookup key.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => Some((*s).to_string()),
            Self::Access(a) => Some(a.as_str().to_string()),
            Self::Status(s) => Some(s.as_str().to_string()),
            Self::Time(t) => Some(t.to_iso8601()),
            Self::Key(k) => Some(k.to_string()),
            Self::Reference(r) => Some(r.lookup_key()),
        }
    }

    /// The reference, if this field holds one.
    pub fn reference(&self) -> Option<&'a Reference> {
        match self {
            Self::Reference(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TagDraft {
        TagDraft::new("example_tag_1", "v1")
            .with_target(Reference::user("alice"))
            .with_owner(Reference::user("bob"))
    }

    #[test]
    fn build_assigns_identity_and_valid_status() {
        let tag = draft().build().unwrap();
        assert_eq!(tag.status(), TagStatus::Valid);
        assert!(tag.is_valid());
        assert!(tag.invalidated_at().is_none());
        assert!(!tag.is_persisted());
        assert_eq!(tag.to_string(), "v1");
    }

    #[test]
    fn build_requires_target() {
        let err = TagDraft::new("t", "v").build().unwrap_err();
        assert_eq!(err, TagError::MissingTarget);
    }

    #[test]
    fn build_rejects_blank_locator() {
        let err = TagDraft::new("t", "v").with_locator("  ").build().unwrap_err();
        assert_eq!(err, TagError::MissingTarget);
    }

    #[test]
    fn build_requires_tag_type() {
        let err = TagDraft::new(" ", "v")
            .with_target(Reference::user("alice"))
            .build()
            .unwrap_err();
        assert_eq!(err, TagError::EmptyTagType);
    }

    #[test]
    fn locator_is_wrapped_in_proxy() {
        let tag = TagDraft::new("t", "v")
            .with_locator("course-v1:Org+Course+Run")
            .build()
            .unwrap();
        assert_eq!(tag.resource_locator(), Some("course-v1:Org+Course+Run"));
        assert_eq!(tag.target(), Some(&Reference::proxy("course-v1:Org+Course+Run")));
        assert_eq!(tag.target().and_then(|r| r.entity_type()), None);
    }

    #[test]
    fn invalidate_sets_once() {
        let mut tag = draft().build().unwrap();
        let at = Timestamp::now();
        tag.invalidate_at(at).unwrap();
        assert_eq!(tag.status(), TagStatus::Invalid);
        assert_eq!(tag.invalidated_at(), Some(at));
        assert!(!tag.is_valid());

        let err = tag.invalidate_at(Timestamp::now()).unwrap_err();
        assert!(matches!(err, TagError::AlreadyInvalidated { .. }));
        assert_eq!(tag.invalidated_at(), Some(at));
    }

    #[test]
    fn field_names_round_trip() {
        for field in TagField::all() {
            assert_eq!(field.as_str().parse::<TagField>().unwrap(), *field);
        }
        assert!("colour".parse::<TagField>().is_err());
    }

    #[test]
    fn reference_field_display_is_type_name() {
        let tag = draft().build().unwrap();
        let target = tag.field(TagField::TargetObject);
        assert_eq!(target.display_name().as_deref(), Some("User"));
        assert_eq!(target.as_text().as_deref(), Some("alice"));
    }

    #[test]
    fn access_field_display_is_choice_name() {
        let tag = draft().with_access(AccessLevel::Private).build().unwrap();
        assert_eq!(
            tag.field(TagField::Access).display_name().as_deref(),
            Some("PRIVATE")
        );
    }

    #[test]
    fn unset_dates_are_empty() {
        let tag = draft().build().unwrap();
        assert!(tag.field(TagField::ExpirationDate).is_empty());
        assert!(tag.field(TagField::ResourceLocator).is_empty());
        assert!(!tag.field(TagField::CreatedAt).is_empty());
    }

    #[test]
    fn persisted_flag_is_not_serialized() {
        let tag = draft().build().unwrap().into_persisted();
        let json = serde_json::to_value(&tag).unwrap();
        assert!(json.get("persisted").is_none());
        let back: Tag = serde_json::from_value(json).unwrap();
        assert!(!back.is_persisted());
        assert_eq!(back.key(), tag.key());
    }

    #[test]
    fn serialized_status_follows_invalidation() {
        let mut tag = draft().build().unwrap();
        assert_eq!(serde_json::to_value(&tag).unwrap()["status"], "VALID");
        tag.invalidate_at(Timestamp::now()).unwrap();
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["status"], "INVALID");
        let back: Tag = serde_json::from_value(json).unwrap();
        assert_eq!(back.status(), TagStatus::Invalid);
        assert!(!back.is_valid());
    }

    #[test]
    fn invalid_status_without_invalidation_time_is_refused() {
        let mut json = serde_json::to_value(draft().build().unwrap()).unwrap();
        json["status"] = "INVALID".into();
        let err = serde_json::from_value::<Tag>(json).unwrap_err();
        assert!(err.to_string().contains("inconsistent"), "{err}");
    }

    #[test]
    fn valid_status_with_invalidation_time_is_refused() {
        let mut json = serde_json::to_value(draft().build().unwrap()).unwrap();
        json["invalidated_at"] = "2026-03-01T08:15:30Z".into();
        assert!(serde_json::from_value::<Tag>(json).is_err());
    }
}
