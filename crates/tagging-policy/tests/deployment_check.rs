//! Checking a whole deployment's tag definitions at once.

use tagging_policy::{PolicyCompiler, PolicyDefect, PolicyStore, PredicateKind};

const DEFINITIONS: &str = r#"
- tag_type: example_tag_1
  validate_tag_value:
    in: [v1, v2]
  validate_target_object: User
  validate_owner_object: User
- tag_type: subscription_tier
  validate_access: PRIVATE
  validate_tag_value:
    regex: '^tier-[0-9]+$'
  validate_target_object:
    object: courseenrollment
- tag_type: course_label
  validate_resource_locator:
    opaque_key: CourseKey
  validate_owner_object:
    object: site
- tag_type: broken
  validate_tag_value:
    frobnicate: true
  validate_expiry: soon
"#;

#[test]
fn reports_every_record_in_order() {
    let store = PolicyStore::from_yaml_str(DEFINITIONS).unwrap();
    let reports = PolicyCompiler::default().check_store(&store);

    let types: Vec<&str> = reports.iter().map(|r| r.tag_type.as_str()).collect();
    assert_eq!(
        types,
        vec!["example_tag_1", "subscription_tier", "course_label", "broken"]
    );
    assert!(reports[..3].iter().all(|r| r.is_clean()));
}

#[test]
fn broken_record_lists_all_defects() {
    let store = PolicyStore::from_yaml_str(DEFINITIONS).unwrap();
    let reports = PolicyCompiler::default().check_store(&store);
    let broken = &reports[3];

    assert_eq!(
        broken.defects,
        vec![
            PolicyDefect::UnknownPredicate {
                field: "tag_value".into(),
                predicate: "frobnicate".into(),
            },
            PolicyDefect::UnknownField {
                field: "expiry".into()
            },
            PolicyDefect::MissingTargetClause,
        ]
    );
}

#[test]
fn compiled_policy_exposes_owner_default() {
    let store = PolicyStore::from_yaml_str(DEFINITIONS).unwrap();
    let compiler = PolicyCompiler::default();

    let tier = compiler
        .compile(store.get_policy("subscription_tier").unwrap())
        .unwrap();
    assert!(tier.owner_defaults_to_site());

    let label = compiler
        .compile(store.get_policy("course_label").unwrap())
        .unwrap();
    assert!(!label.owner_defaults_to_site());
    assert_eq!(
        label.clauses()[1].check.predicate(),
        PredicateKind::Object
    );
}
