//! # Reference Resolver
//!
//! Dispatches a [`Reference`] to the matching [`ReferenceBackend`] lookup
//! and bounds the call with a timeout. Outcomes:
//!
//! - found: [`ResolvedEntity`], logged at `info` for audit;
//! - absent: [`ResolveError::NotFound`];
//! - transport failure or timeout: [`ResolveError::Unavailable`];
//! - a locator proxy or other reference with no entity type:
//!   [`ResolveError::UnsupportedEntityType`].
//!
//! The resolver never retries.

use std::sync::Arc;
use std::time::Duration;

use tagging_core::{EntityType, Reference};

use crate::backend::ReferenceBackend;
use crate::entity::ResolvedEntity;
use crate::error::{BackendError, ResolveError};

/// Lookup bound used when the caller does not give one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout-bounded dispatcher over a backend.
#[derive(Clone)]
pub struct ReferenceResolver {
    backend: Arc<dyn ReferenceBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ReferenceResolver {
    /// Wrap `backend` with [`DEFAULT_TIMEOUT`].
    pub fn new(backend: Arc<dyn ReferenceBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The default timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `reference` under the default timeout.
    pub async fn resolve(&self, reference: &Reference) -> Result<ResolvedEntity, ResolveError> {
        self.resolve_within(reference, self.timeout).await
    }

    /// Resolve `reference` under `timeout`.
    pub async fn resolve_within(
        &self,
        reference: &Reference,
        timeout: Duration,
    ) -> Result<ResolvedEntity, ResolveError> {
        let Some(entity_type) = reference.entity_type() else {
            return Err(ResolveError::UnsupportedEntityType(
                reference.kind().type_name().to_string(),
            ));
        };
        let key = reference.lookup_key();

        let lookup = async {
            match reference {
                Reference::User { username } => self
                    .backend
                    .lookup_user(username)
                    .await
                    .map(|r| r.map(ResolvedEntity::User)),
                Reference::Course { course_id } => self
                    .backend
                    .lookup_course(course_id)
                    .await
                    .map(|r| r.map(ResolvedEntity::Course)),
                Reference::Enrollment {
                    username,
                    course_id,
                } => self
                    .backend
                    .lookup_enrollment(username, course_id)
                    .await
                    .map(|r| r.map(ResolvedEntity::Enrollment)),
                Reference::Site { site_id } => self
                    .backend
                    .lookup_site(site_id)
                    .await
                    .map(|r| r.map(ResolvedEntity::Site)),
                Reference::ProxyLocator { .. } => Ok(None),
            }
        };

        let outcome = tokio::time::timeout(timeout, lookup).await;
        finish(entity_type, key, outcome, timeout)
    }

    /// Resolve by entity type and textual lookup key. Enrollment keys are
    /// `username::course_id`.
    pub async fn resolve_key(
        &self,
        entity_type: EntityType,
        lookup_key: &str,
    ) -> Result<ResolvedEntity, ResolveError> {
        let reference = match entity_type {
            EntityType::User => Reference::user(lookup_key),
            EntityType::Course => Reference::course(lookup_key),
            EntityType::Site => Reference::site(lookup_key),
            EntityType::Enrollment => {
                let (username, course_id) = lookup_key
                    .split_once("::")
                    .filter(|(u, c)| !u.is_empty() && !c.is_empty())
                    .ok_or_else(|| ResolveError::MalformedKey {
                        entity_type,
                        key: lookup_key.to_string(),
                    })?;
                Reference::enrollment(username, course_id)
            }
        };
        self.resolve(&reference).await
    }
}

fn finish(
    entity_type: EntityType,
    key: String,
    outcome: Result<Result<Option<ResolvedEntity>, BackendError>, tokio::time::error::Elapsed>,
    timeout: Duration,
) -> Result<ResolvedEntity, ResolveError> {
    match outcome {
        Ok(Ok(Some(entity))) => {
            tracing::info!(entity_type = %entity_type, key = %key, "reference resolved");
            Ok(entity)
        }
        Ok(Ok(None)) => {
            tracing::debug!(entity_type = %entity_type, key = %key, "reference not found");
            Err(ResolveError::NotFound { entity_type, key })
        }
        Ok(Err(e)) => {
            tracing::warn!(entity_type = %entity_type, key = %key, error = %e, "reference backend failed");
            Err(ResolveError::Unavailable {
                entity_type,
                key,
                reason: e.to_string(),
            })
        }
        Err(_) => {
            tracing::warn!(entity_type = %entity_type, key = %key, ?timeout, "reference lookup timed out");
            Err(ResolveError::Unavailable {
                entity_type,
                key,
                reason: format!("timed out after {}ms", timeout.as_millis()),
            })
        }
    }
}
