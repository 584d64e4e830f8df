//! # Tag Storage
//!
//! The engine treats storage as a capability: persist, fetch, soft-delete,
//! hard-delete, and query. [`TagStore`] is that seam; [`InMemoryTagStore`]
//! is the implementation used by the CLI and tests.
//!
//! A store enforces two invariants of its own: at most one record per key,
//! and no record without a target or resource locator. Tags come back from
//! a store marked persisted, so a second save is caught by the engine.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use tagging_core::{Reference, Tag, TagKey, TagStatus, Timestamp};

use crate::error::StoreError;

/// Filter for [`TagStore::find`]. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    /// Owner reference.
    pub owner: Option<Reference>,
    /// Target reference (a proxy for locator targets).
    pub target: Option<Reference>,
    /// Tag type.
    pub tag_type: Option<String>,
    /// Status.
    pub status: Option<TagStatus>,
}

impl TagQuery {
    /// Match everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only tags owned by `owner`.
    pub fn owned_by(mut self, owner: Reference) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Only tags on `target`.
    pub fn targeting(mut self, target: Reference) -> Self {
        self.target = Some(target);
        self
    }

    /// Only tags of `tag_type`.
    pub fn of_type(mut self, tag_type: impl Into<String>) -> Self {
        self.tag_type = Some(tag_type.into());
        self
    }

    /// Only tags with `status`.
    pub fn with_status(mut self, status: TagStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether `tag` satisfies every set criterion.
    pub fn matches(&self, tag: &Tag) -> bool {
        self.owner.as_ref().map_or(true, |o| tag.owner() == Some(o))
            && self.target.as_ref().map_or(true, |t| tag.target() == Some(t))
            && self.tag_type.as_ref().map_or(true, |t| &tag.tag_type == t)
            && self.status.map_or(true, |s| tag.status() == s)
    }
}

/// Persistence capability for tags.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Persist a new tag and return it marked persisted.
    async fn insert(&self, tag: Tag) -> Result<Tag, StoreError>;

    /// Fetch by key.
    async fn get(&self, key: TagKey) -> Result<Option<Tag>, StoreError>;

    /// Set `invalidated_at` once and return the updated tag.
    async fn mark_invalidated(&self, key: TagKey, at: Timestamp) -> Result<Tag, StoreError>;

    /// Hard-delete. Returns whether a record was removed.
    async fn remove(&self, key: TagKey) -> Result<bool, StoreError>;

    /// Tags matching `query`, oldest first.
    async fn find(&self, query: &TagQuery) -> Result<Vec<Tag>, StoreError>;
}

/// Thread-safe in-memory [`TagStore`].
#[derive(Debug, Default)]
pub struct InMemoryTagStore {
    tags: RwLock<BTreeMap<TagKey, Tag>>,
}

impl InMemoryTagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tags, including invalidated ones.
    pub fn len(&self) -> usize {
        self.tags.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.tags.read().is_empty()
    }
}

#[async_trait]
impl TagStore for InMemoryTagStore {
    async fn insert(&self, tag: Tag) -> Result<Tag, StoreError> {
        let key = tag.key();
        if tag.target().is_none() && tag.resource_locator().is_none() {
            return Err(StoreError::MissingTarget { key });
        }
        let mut tags = self.tags.write();
        if tags.contains_key(&key) {
            return Err(StoreError::DuplicateKey { key });
        }
        let stored = tag.into_persisted();
        tags.insert(key, stored.clone());
        tracing::debug!(key = %key, tag_type = %stored.tag_type, "tag stored");
        Ok(stored)
    }

    async fn get(&self, key: TagKey) -> Result<Option<Tag>, StoreError> {
        Ok(self.tags.read().get(&key).cloned())
    }

    async fn mark_invalidated(&self, key: TagKey, at: Timestamp) -> Result<Tag, StoreError> {
        let mut tags = self.tags.write();
        let tag = tags.get_mut(&key).ok_or(StoreError::NotFound { key })?;
        tag.invalidate_at(at)
            .map_err(|_| StoreError::AlreadyInvalidated { key })?;
        Ok(tag.clone())
    }

    async fn remove(&self, key: TagKey) -> Result<bool, StoreError> {
        Ok(self.tags.write().remove(&key).is_some())
    }

    async fn find(&self, query: &TagQuery) -> Result<Vec<Tag>, StoreError> {
        let mut found: Vec<Tag> = self
            .tags
            .read()
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        found.sort_by_key(|t| (t.created_at(), t.key()));
        Ok(found)
    }
}
