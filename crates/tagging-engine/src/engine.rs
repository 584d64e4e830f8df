//! # Validation Engine
//!
//! Decides whether a candidate [`Tag`] satisfies its tag type's policy.
//! Evaluation is a fixed sequence of states, each of which can end in a
//! [`Rejection`]:
//!
//! ```text
//! Start → PolicySelected → StructureChecked → NotAnUpdateConfirmed
//!       → FieldsChecked → ReferencesChecked → Valid
//! ```
//!
//! 1. **PolicySelected**: the tag type has a policy, else
//!    [`Rejection::UnconfiguredTagType`].
//! 2. **StructureChecked**: the policy compiled, else
//!    [`Rejection::MalformedPolicy`]. Policies are compiled once when the
//!    engine is built and the outcome is cached per tag type.
//! 3. **NotAnUpdateConfirmed**: the candidate is not persisted, else
//!    [`Rejection::ImmutableTagUpdate`].
//! 4. **FieldsChecked**: clauses in configuration order; the first failure
//!    stops evaluation.
//! 5. **ReferencesChecked**: target, then owner. A reference with an entity
//!    type is resolved; a locator proxy has none and is skipped.
//!
//! The engine never persists anything. It holds only immutable state and
//! is `Send + Sync`, so one instance serves concurrent validations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tagging_core::{ExternalKeyParser, Reference, ReferenceRole, Tag};
use tagging_policy::{
    CompiledPolicy, PolicyCompiler, PolicyDefect, PolicyStore, PredicateFailure,
};
use tagging_resolver::{ReferenceResolver, ResolveError, ResolvedEntity};

use crate::error::Rejection;

/// Evidence that a candidate passed every check.
#[derive(Debug, Clone)]
pub struct Valid {
    /// The policy the tag satisfied.
    pub policy: Arc<CompiledPolicy>,
    /// The resolved target, when the target has an entity type.
    pub target: Option<ResolvedEntity>,
    /// The resolved owner, when an owner is present.
    pub owner: Option<ResolvedEntity>,
}

/// Evaluation states, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    /// Policy found.
    PolicySelected,
    /// Policy compiled.
    StructureChecked,
    /// Candidate not persisted.
    NotAnUpdateConfirmed,
    /// Every clause passed.
    FieldsChecked,
    /// Every reference resolved.
    ReferencesChecked,
}

impl ValidationState {
    /// The state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicySelected => "policy_selected",
            Self::StructureChecked => "structure_checked",
            Self::NotAnUpdateConfirmed => "not_an_update_confirmed",
            Self::FieldsChecked => "fields_checked",
            Self::ReferencesChecked => "references_checked",
        }
    }
}

type CachedPolicy = Result<Arc<CompiledPolicy>, PolicyDefect>;

/// The tag validation engine.
pub struct ValidationEngine {
    policies: HashMap<String, CachedPolicy>,
    keys: Arc<dyn ExternalKeyParser>,
    resolver: ReferenceResolver,
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tag_types: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        tag_types.sort_unstable();
        f.debug_struct("ValidationEngine")
            .field("tag_types", &tag_types)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl ValidationEngine {
    /// Compile every policy in `store` and cache the outcomes.
    pub fn new(store: &PolicyStore, compiler: &PolicyCompiler, resolver: ReferenceResolver) -> Self {
        let mut policies = HashMap::with_capacity(store.len());
        for record in store.iter() {
            let compiled = compiler.compile(record).map(Arc::new);
            if let Err(defect) = &compiled {
                tracing::warn!(tag_type = record.tag_type(), %defect, "policy failed structure check");
            }
            policies.insert(record.tag_type().to_string(), compiled);
        }
        Self {
            policies,
            keys: Arc::clone(compiler.key_parser()),
            resolver,
        }
    }

    /// The compiled policy for `tag_type`, or the rejection a tag of that
    /// type would receive at the structure check.
    pub fn policy(&self, tag_type: &str) -> Result<Arc<CompiledPolicy>, Rejection> {
        match self.policies.get(tag_type) {
            None => Err(Rejection::UnconfiguredTagType {
                tag_type: tag_type.to_string(),
            }),
            Some(Err(defect)) => Err(Rejection::MalformedPolicy {
                tag_type: tag_type.to_string(),
                defect: defect.clone(),
            }),
            Some(Ok(policy)) => Ok(Arc::clone(policy)),
        }
    }

    /// The resolver handle.
    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Validate under the resolver's default timeout.
    pub async fn validate(&self, tag: &Tag) -> Result<Valid, Rejection> {
        self.validate_within(tag, self.resolver.timeout()).await
    }

    /// Validate with each reference lookup bounded by `timeout`.
    pub async fn validate_within(&self, tag: &Tag, timeout: Duration) -> Result<Valid, Rejection> {
        let result = self.run(tag, timeout).await;
        match &result {
            Ok(_) => tracing::info!(tag_type = %tag.tag_type, key = %tag.key(), "tag accepted"),
            Err(rejection) => tracing::warn!(
                tag_type = %tag.tag_type,
                key = %tag.key(),
                kind = rejection.kind(),
                %rejection,
                "tag rejected"
            ),
        }
        result
    }

    async fn run(&self, tag: &Tag, timeout: Duration) -> Result<Valid, Rejection> {
        let cached = self.policies.get(&tag.tag_type).ok_or_else(|| Rejection::UnconfiguredTagType {
            tag_type: tag.tag_type.clone(),
        })?;
        trace_state(tag, ValidationState::PolicySelected);

        let policy = cached.as_ref().map_err(|defect| Rejection::MalformedPolicy {
            tag_type: tag.tag_type.clone(),
            defect: defect.clone(),
        })?;
        trace_state(tag, ValidationState::StructureChecked);

        if tag.is_persisted() {
            return Err(Rejection::ImmutableTagUpdate { key: tag.key() });
        }
        trace_state(tag, ValidationState::NotAnUpdateConfirmed);

        for clause in policy.clauses() {
            clause
                .evaluate(tag, self.keys.as_ref())
                .map_err(|failure| match failure {
                    PredicateFailure::Mismatch(reason) => Rejection::FieldValidationFailed {
                        field: clause.field,
                        predicate: clause.check.predicate(),
                        reason,
                    },
                    PredicateFailure::MalformedKey(error) => Rejection::MalformedExternalKey {
                        field: clause.field,
                        error,
                    },
                })?;
        }
        trace_state(tag, ValidationState::FieldsChecked);

        let target = self
            .check_reference(ReferenceRole::Target, tag.target(), timeout)
            .await?;
        let owner = self
            .check_reference(ReferenceRole::Owner, tag.owner(), timeout)
            .await?;
        trace_state(tag, ValidationState::ReferencesChecked);

        Ok(Valid {
            policy: Arc::clone(policy),
            target,
            owner,
        })
    }

    async fn check_reference(
        &self,
        role: ReferenceRole,
        reference: Option<&Reference>,
        timeout: Duration,
    ) -> Result<Option<ResolvedEntity>, Rejection> {
        let Some(reference) = reference else {
            return Ok(None);
        };
        let Some(entity_type) = reference.entity_type() else {
            tracing::debug!(role = %role, %reference, "reference has no entity type, skipping resolution");
            return Ok(None);
        };

        match self.resolver.resolve_within(reference, timeout).await {
            Ok(entity) => Ok(Some(entity)),
            Err(ResolveError::Unavailable { reason, .. }) => Err(Rejection::ResolverUnavailable {
                role,
                entity_type,
                reason,
            }),
            // Proxies return early above, and every other current kind has a
            // backend lookup, so only a future ReferenceKind without one lands here.
            Err(ResolveError::UnsupportedEntityType(kind)) => {
                Err(Rejection::UnsupportedEntityType { role, kind })
            }
            Err(e @ (ResolveError::NotFound { .. } | ResolveError::MalformedKey { .. })) => {
                Err(Rejection::ReferenceIntegrityFailed {
                    role,
                    entity_type,
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn trace_state(tag: &Tag, state: ValidationState) {
    tracing::debug!(tag_type = %tag.tag_type, key = %tag.key(), state = state.as_str(), "validation state");
}
