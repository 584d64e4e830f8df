//! # tagging-policy: Declarative Tag Policies
//!
//! A deployment declares one policy per `tag_type`. Each policy is a list
//! of `validate_<field>` clauses whose values are literals or predicate
//! mappings. This crate owns everything between the configuration text and
//! a checked, typed policy:
//!
//! - [`record`]: order-preserving raw records.
//! - [`store`]: the read-only `tag_type` index.
//! - [`predicate`]: the predicate library and the name registry.
//! - [`clause`]: typed clauses and their evaluation.
//! - [`compile`]: the structure check.
//!
//! The engine compiles each record once and caches the outcome; a record
//! that fails the structure check rejects every tag of its type.

pub mod clause;
pub mod compile;
pub mod error;
pub mod predicate;
pub mod record;
pub mod store;

pub use clause::{Clause, ClauseCheck};
pub use compile::{CompiledPolicy, PolicyCompiler, PolicyReport};
pub use error::{PolicyDefect, PolicyLoadError};
pub use predicate::{PredicateFailure, PredicateKind, PredicateRegistry};
pub use record::{PolicyRecord, RawClause, CLAUSE_PREFIX};
pub use store::PolicyStore;
