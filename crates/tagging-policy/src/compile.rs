//! # Structure Check
//!
//! Turns a [`PolicyRecord`] into a [`CompiledPolicy`] whose clauses are
//! typed and whose arguments are already checked:
//!
//! - every predicate name is in the [`PredicateRegistry`];
//! - `in` has a list, `regex` compiles, `object` names a known reference
//!   kind on a reference field, `external_key_format` names a kind the key
//!   parser supports;
//! - every clause targets a real [`TagField`];
//! - a target clause (`validate_target_object` or
//!   `validate_resource_locator`) is present.
//!
//! A clause value is a scalar (implicit `equals`), a list (implicit `in`),
//! or a mapping of predicate name to argument. A mapping with several
//! entries yields one clause per entry, in mapping order.
//!
//! When no clause targets `owner_object`, the compiled policy records the
//! default owner type `Site`. That default is not enforced against the tag;
//! the lifecycle service uses it to fill in a missing owner.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use serde_yaml::Value;

use tagging_core::{ExternalKeyParser, ReferenceKind, StandardKeyParser, TagField};

use crate::clause::{Clause, ClauseCheck};
use crate::error::PolicyDefect;
use crate::predicate::{PredicateKind, PredicateRegistry};
use crate::record::{PolicyRecord, RawClause};
use crate::store::PolicyStore;

/// A policy that passed the structure check.
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    tag_type: String,
    clauses: Vec<Clause>,
    default_owner_type: Option<ReferenceKind>,
}

impl CompiledPolicy {
    /// The governed tag type.
    pub fn tag_type(&self) -> &str {
        &self.tag_type
    }

    /// Clauses in configuration order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The owner type assumed when the record has no owner clause.
    pub fn default_owner_type(&self) -> Option<ReferenceKind> {
        self.default_owner_type
    }

    /// Whether a missing owner should default to the deployment's site.
    pub fn owner_defaults_to_site(&self) -> bool {
        self.default_owner_type == Some(ReferenceKind::Site)
    }
}

/// Every defect of one record, from [`PolicyCompiler::check_store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyReport {
    /// The record's tag type.
    pub tag_type: String,
    /// Defects in clause order; empty when the record compiles.
    pub defects: Vec<PolicyDefect>,
}

impl PolicyReport {
    /// Whether the record compiled cleanly.
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }
}

/// Compiles policy records against a predicate registry and key parser.
#[derive(Clone)]
pub struct PolicyCompiler {
    registry: PredicateRegistry,
    keys: Arc<dyn ExternalKeyParser>,
}

impl std::fmt::Debug for PolicyCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyCompiler")
            .field("predicates", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl Default for PolicyCompiler {
    fn default() -> Self {
        Self::new(PredicateRegistry::standard(), Arc::new(StandardKeyParser))
    }
}

impl PolicyCompiler {
    /// Create a compiler.
    pub fn new(registry: PredicateRegistry, keys: Arc<dyn ExternalKeyParser>) -> Self {
        Self { registry, keys }
    }

    /// The key parser used for `external_key_format` arguments.
    pub fn key_parser(&self) -> &Arc<dyn ExternalKeyParser> {
        &self.keys
    }

    /// Compile `record`, stopping at the first defect.
    pub fn compile(&self, record: &PolicyRecord) -> Result<CompiledPolicy, PolicyDefect> {
        let (policy, defects) = self.compile_inner(record);
        match defects.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(policy),
        }
    }

    /// Compile `record`, collecting every defect.
    pub fn compile_all_defects(
        &self,
        record: &PolicyRecord,
    ) -> Result<CompiledPolicy, Vec<PolicyDefect>> {
        let (policy, defects) = self.compile_inner(record);
        if defects.is_empty() {
            Ok(policy)
        } else {
            Err(defects)
        }
    }

    /// Check every record in `store`, in configuration order.
    pub fn check_store(&self, store: &PolicyStore) -> Vec<PolicyReport> {
        store
            .iter()
            .map(|record| PolicyReport {
                tag_type: record.tag_type().to_string(),
                defects: self.compile_all_defects(record).err().unwrap_or_default(),
            })
            .collect()
    }

    fn compile_inner(&self, record: &PolicyRecord) -> (CompiledPolicy, Vec<PolicyDefect>) {
        let mut clauses = Vec::new();
        let mut defects = Vec::new();
        let mut has_target = false;
        let mut has_owner = false;

        for raw in record.clauses() {
            let field_name = raw.field_name();
            let field = match field_name.parse::<TagField>() {
                Ok(field) => field,
                Err(_) => {
                    defects.push(PolicyDefect::UnknownField {
                        field: field_name.to_string(),
                    });
                    continue;
                }
            };
            match field {
                TagField::TargetObject | TagField::ResourceLocator => has_target = true,
                TagField::OwnerObject => has_owner = true,
                _ => {}
            }
            for check in self.parse_value(field, raw) {
                match check {
                    Ok(check) => clauses.push(Clause { field, check }),
                    Err(defect) => defects.push(defect),
                }
            }
        }

        if !has_target {
            defects.push(PolicyDefect::MissingTargetClause);
        }
        let default_owner_type = if has_owner {
            None
        } else {
            tracing::debug!(tag_type = record.tag_type(), "no owner clause, owner defaults to site");
            Some(ReferenceKind::Site)
        };

        let policy = CompiledPolicy {
            tag_type: record.tag_type().to_string(),
            clauses,
            default_owner_type,
        };
        (policy, defects)
    }

    fn parse_value(&self, field: TagField, raw: &RawClause) -> Vec<Result<ClauseCheck, PolicyDefect>> {
        let name = field.as_str();
        match &raw.value {
            Value::Mapping(entries) if entries.is_empty() => vec![Err(invalid(name, "mapping", "no predicate given"))],
            Value::Mapping(entries) => entries
                .iter()
                .map(|(key, arg)| {
                    let Some(predicate) = key.as_str() else {
                        return Err(invalid(name, "mapping", "predicate name must be a string"));
                    };
                    match self.registry.lookup(predicate) {
                        Some(kind) => self.parse_argument(field, kind, arg),
                        None => Err(PolicyDefect::UnknownPredicate {
                            field: name.to_string(),
                            predicate: predicate.to_string(),
                        }),
                    }
                })
                .collect(),
            Value::Sequence(_) => vec![self.parse_argument(field, PredicateKind::In, &raw.value)],
            Value::Tagged(tagged) => vec![self.parse_argument(field, PredicateKind::Equals, &tagged.value)],
            other => vec![self.parse_argument(field, PredicateKind::Equals, other)],
        }
    }

    fn parse_argument(
        &self,
        field: TagField,
        kind: PredicateKind,
        arg: &Value,
    ) -> Result<ClauseCheck, PolicyDefect> {
        let name = field.as_str();
        let predicate = kind.as_str();
        match kind {
            PredicateKind::Equals => scalar_text(arg)
                .map(ClauseCheck::Equals)
                .ok_or_else(|| invalid(name, predicate, "expected a scalar")),
            PredicateKind::In => {
                let Value::Sequence(items) = arg else {
                    return Err(invalid(name, predicate, "expected a list"));
                };
                let mut allowed = BTreeSet::new();
                for item in items {
                    let text = scalar_text(item)
                        .ok_or_else(|| invalid(name, predicate, "list items must be scalars"))?;
                    allowed.insert(text);
                }
                if allowed.is_empty() {
                    return Err(invalid(name, predicate, "list is empty"));
                }
                Ok(ClauseCheck::InSet(allowed))
            }
            PredicateKind::Exists => Ok(ClauseCheck::Exists),
            PredicateKind::Regex => {
                let pattern = arg
                    .as_str()
                    .ok_or_else(|| invalid(name, predicate, "expected a pattern string"))?;
                Regex::new(pattern)
                    .map(ClauseCheck::Regex)
                    .map_err(|e| PolicyDefect::InvalidRegex {
                        field: name.to_string(),
                        pattern: pattern.to_string(),
                        reason: e.to_string(),
                    })
            }
            PredicateKind::Object => {
                if !field.is_reference() {
                    return Err(invalid(name, predicate, "field does not hold a reference"));
                }
                let type_name = arg
                    .as_str()
                    .ok_or_else(|| invalid(name, predicate, "expected a type name"))?;
                ReferenceKind::from_name(type_name)
                    .map(ClauseCheck::ObjectIs)
                    .ok_or_else(|| PolicyDefect::UnknownObjectKind {
                        field: name.to_string(),
                        kind: type_name.to_string(),
                    })
            }
            PredicateKind::ExternalKeyFormat => {
                let key_kind = arg
                    .as_str()
                    .ok_or_else(|| invalid(name, predicate, "expected a key kind"))?;
                if self.keys.supports(key_kind) {
                    Ok(ClauseCheck::ExternalKeyFormat(key_kind.to_string()))
                } else {
                    Err(PolicyDefect::UnsupportedKeyKind {
                        field: name.to_string(),
                        kind: key_kind.to_string(),
                    })
                }
            }
        }
    }
}

fn invalid(field: &str, predicate: &str, reason: &str) -> PolicyDefect {
    PolicyDefect::InvalidArgument {
        field: field.to_string(),
        predicate: predicate.to_string(),
        reason: reason.to_string(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(yaml: &str) -> PolicyRecord {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn compiler() -> PolicyCompiler {
        PolicyCompiler::default()
    }

    #[test]
    fn compiles_typed_clauses_in_order() {
        let policy = compiler()
            .compile(&record(
                "tag_type: t\nvalidate_tag_value:\n  in: [v1, v2]\nvalidate_target_object: User\nvalidate_owner_object: User\n",
            ))
            .unwrap();
        let predicates: Vec<PredicateKind> = policy.clauses().iter().map(|c| c.check.predicate()).collect();
        assert_eq!(
            predicates,
            vec![PredicateKind::In, PredicateKind::Equals, PredicateKind::Equals]
        );
        assert_eq!(policy.default_owner_type(), None);
    }

    #[test]
    fn missing_owner_clause_defaults_to_site() {
        let policy = compiler()
            .compile(&record("tag_type: t\nvalidate_target_object: User\n"))
            .unwrap();
        assert_eq!(policy.default_owner_type(), Some(ReferenceKind::Site));
        assert!(policy.owner_defaults_to_site());
        assert_eq!(policy.clauses().len(), 1);
    }

    #[test]
    fn unknown_predicate_is_a_defect() {
        let err = compiler()
            .compile(&record("tag_type: t\nvalidate_tag_value:\n  frobnicate: x\nvalidate_target_object: User\n"))
            .unwrap_err();
        assert_eq!(
            err,
            PolicyDefect::UnknownPredicate {
                field: "tag_value".into(),
                predicate: "frobnicate".into()
            }
        );
    }

    #[test]
    fn unknown_field_is_a_defect() {
        let err = compiler()
            .compile(&record("tag_type: t\nvalidate_colour: red\nvalidate_target_object: User\n"))
            .unwrap_err();
        assert_eq!(err, PolicyDefect::UnknownField { field: "colour".into() });
    }

    #[test]
    fn target_clause_is_required() {
        let err = compiler()
            .compile(&record("tag_type: t\nvalidate_tag_value: x\n"))
            .unwrap_err();
        assert_eq!(err, PolicyDefect::MissingTargetClause);
    }

    #[test]
    fn resource_locator_counts_as_target_clause() {
        let policy = compiler()
            .compile(&record(
                "tag_type: t\nvalidate_resource_locator:\n  external_key_format: CourseKey\n",
            ))
            .unwrap();
        assert_eq!(policy.clauses()[0].check.predicate(), PredicateKind::ExternalKeyFormat);
    }

    #[test]
    fn opaque_key_alias_compiles() {
        let policy = compiler()
            .compile(&record("tag_type: t\nvalidate_resource_locator:\n  OpaqueKey: CourseKey\n"))
            .unwrap();
        assert_eq!(policy.clauses()[0].check.predicate(), PredicateKind::ExternalKeyFormat);
    }

    #[test]
    fn argument_shapes_are_checked() {
        let c = compiler();
        let in_scalar = c
            .compile(&record("tag_type: t\nvalidate_tag_value:\n  in: v1\nvalidate_target_object: User\n"))
            .unwrap_err();
        assert!(matches!(in_scalar, PolicyDefect::InvalidArgument { ref predicate, .. } if predicate == "in"));

        let bad_regex = c
            .compile(&record("tag_type: t\nvalidate_tag_value:\n  regex: '(unclosed'\nvalidate_target_object: User\n"))
            .unwrap_err();
        assert!(matches!(bad_regex, PolicyDefect::InvalidRegex { .. }));

        let bad_object = c
            .compile(&record("tag_type: t\nvalidate_target_object:\n  object: Badge\n"))
            .unwrap_err();
        assert!(matches!(bad_object, PolicyDefect::UnknownObjectKind { .. }));

        let object_on_text = c
            .compile(&record("tag_type: t\nvalidate_tag_value:\n  object: User\nvalidate_target_object: User\n"))
            .unwrap_err();
        assert!(matches!(object_on_text, PolicyDefect::InvalidArgument { .. }));

        let bad_kind = c
            .compile(&record("tag_type: t\nvalidate_resource_locator:\n  external_key_format: LibraryKey\n"))
            .unwrap_err();
        assert!(matches!(bad_kind, PolicyDefect::UnsupportedKeyKind { .. }));
    }

    #[test]
    fn bare_list_is_implicit_in() {
        let policy = compiler()
            .compile(&record("tag_type: t\nvalidate_tag_value: [a, b]\nvalidate_target_object: User\n"))
            .unwrap();
        assert_eq!(policy.clauses()[0].check.predicate(), PredicateKind::In);
    }

    #[test]
    fn multi_predicate_mapping_yields_one_clause_each() {
        let policy = compiler()
            .compile(&record(
                "tag_type: t\nvalidate_tag_value:\n  exists: true\n  regex: '^v'\nvalidate_target_object: User\n",
            ))
            .unwrap();
        let predicates: Vec<PredicateKind> = policy.clauses().iter().map(|c| c.check.predicate()).collect();
        assert_eq!(predicates[..2], [PredicateKind::Exists, PredicateKind::Regex]);
    }

    #[test]
    fn collects_every_defect() {
        let defects = compiler()
            .compile_all_defects(&record(
                "tag_type: t\nvalidate_colour: red\nvalidate_tag_value:\n  frobnicate: x\n",
            ))
            .unwrap_err();
        assert_eq!(defects.len(), 3);
        assert_eq!(defects[2], PolicyDefect::MissingTargetClause);
    }

    #[test]
    fn numeric_scalars_become_text() {
        let policy = compiler()
            .compile(&record("tag_type: t\nvalidate_access: 3\nvalidate_target_object: User\n"))
            .unwrap();
        assert_eq!(policy.clauses()[0].check.to_string(), "equals \"3\"");
    }
}
