//! # Tag Lifecycle Service
//!
//! Orchestrates the tag lifecycle around the engine and a [`TagStore`]:
//!
//! - [`TagService::create()`]: build the candidate, fill in the default
//!   owner site when the policy has no owner clause, validate, persist.
//! - [`TagService::save()`]: validate and persist an already-built tag. A
//!   persisted tag, or any tag whose key is already stored, always fails
//!   here with an immutable-update rejection.
//! - [`TagService::invalidate()`]: soft delete, set once.
//! - [`TagService::purge()`]: privileged hard delete, not policy-gated.
//!
//! Nothing is written unless validation succeeds.

use std::sync::Arc;

use tagging_core::{Reference, Tag, TagDraft, TagKey, TagStatus, Timestamp};

use crate::engine::ValidationEngine;
use crate::error::{Rejection, ServiceError, StoreError};
use crate::store::{TagQuery, TagStore};

/// Create, invalidate, purge, and query tags.
#[derive(Clone)]
pub struct TagService {
    engine: Arc<ValidationEngine>,
    store: Arc<dyn TagStore>,
    default_site: Option<String>,
}

impl std::fmt::Debug for TagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagService")
            .field("engine", &self.engine)
            .field("default_site", &self.default_site)
            .finish_non_exhaustive()
    }
}

impl TagService {
    /// Create a service.
    pub fn new(engine: Arc<ValidationEngine>, store: Arc<dyn TagStore>) -> Self {
        Self {
            engine,
            store,
            default_site: None,
        }
    }

    /// Site that owns tags created without an owner under a policy with no
    /// owner clause.
    pub fn with_default_site(mut self, site: impl Into<String>) -> Self {
        self.default_site = Some(site.into());
        self
    }

    /// The engine.
    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// Build, validate, and persist a new tag.
    pub async fn create(&self, mut draft: TagDraft) -> Result<Tag, ServiceError> {
        if draft.owner.is_none() {
            if let (Ok(policy), Some(site)) = (self.engine.policy(&draft.tag_type), &self.default_site) {
                if policy.owner_defaults_to_site() {
                    tracing::debug!(tag_type = %draft.tag_type, site = %site, "owner defaulted to site");
                    draft.owner = Some(Reference::site(site.clone()));
                }
            }
        }
        let candidate = draft.build()?;
        self.save(&candidate).await
    }

    /// Validate and persist `tag`.
    ///
    /// A tag whose key is already stored is treated as persisted, whatever
    /// its in-memory flag says, so the engine rejects it as an update.
    pub async fn save(&self, tag: &Tag) -> Result<Tag, ServiceError> {
        let candidate = if !tag.is_persisted() && self.store.get(tag.key()).await?.is_some() {
            tag.clone().into_persisted()
        } else {
            tag.clone()
        };
        self.engine.validate(&candidate).await?;
        let stored = match self.store.insert(candidate).await {
            Ok(stored) => stored,
            // Lost a race with a concurrent save of the same key.
            Err(StoreError::DuplicateKey { key }) => {
                return Err(Rejection::ImmutableTagUpdate { key }.into())
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(key = %stored.key(), tag_type = %stored.tag_type, "tag created");
        Ok(stored)
    }

    /// Soft-delete the tag with `key`.
    pub async fn invalidate(&self, key: TagKey) -> Result<Tag, ServiceError> {
        let tag = self.store.mark_invalidated(key, Timestamp::now()).await?;
        tracing::info!(key = %key, "tag invalidated");
        Ok(tag)
    }

    /// Hard-delete the tag with `key`, bypassing policy.
    pub async fn purge(&self, key: TagKey) -> Result<(), ServiceError> {
        if self.store.remove(key).await? {
            tracing::info!(key = %key, "tag purged");
            Ok(())
        } else {
            Err(StoreError::NotFound { key }.into())
        }
    }

    /// Fetch by key.
    pub async fn get(&self, key: TagKey) -> Result<Option<Tag>, ServiceError> {
        Ok(self.store.get(key).await?)
    }

    /// Tags matching an arbitrary query.
    pub async fn find(&self, query: &TagQuery) -> Result<Vec<Tag>, ServiceError> {
        Ok(self.store.find(query).await?)
    }

    /// Tags owned by `owner`, optionally restricted to `status`.
    pub async fn find_by_owner(
        &self,
        owner: &Reference,
        status: Option<TagStatus>,
    ) -> Result<Vec<Tag>, ServiceError> {
        self.find(&status_filter(TagQuery::new().owned_by(owner.clone()), status))
            .await
    }

    /// Tags on `target`, optionally restricted to `status`.
    pub async fn find_by_target(
        &self,
        target: &Reference,
        status: Option<TagStatus>,
    ) -> Result<Vec<Tag>, ServiceError> {
        self.find(&status_filter(TagQuery::new().targeting(target.clone()), status))
            .await
    }

    /// Tags of `tag_type`, optionally restricted to `status`.
    pub async fn find_by_type(
        &self,
        tag_type: &str,
        status: Option<TagStatus>,
    ) -> Result<Vec<Tag>, ServiceError> {
        self.find(&status_filter(TagQuery::new().of_type(tag_type), status))
            .await
    }
}

fn status_filter(query: TagQuery, status: Option<TagStatus>) -> TagQuery {
    match status {
        Some(s) => query.with_status(s),
        None => query,
    }
}
