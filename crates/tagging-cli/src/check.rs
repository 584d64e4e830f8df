//! # Check and List Subcommands
//!
//! `check` is the deployment-time gate: every policy is compiled and every
//! defect is printed, not just the first. `list` shows what the engine will
//! actually enforce for each tag type.

use anyhow::Result;
use tagging_engine::TaggingConfig;
use tagging_policy::PolicyCompiler;

/// Execute `tagging check`.
///
/// Returns exit code: 0 when every policy compiles, 1 otherwise.
pub fn run_check(config: &TaggingConfig) -> Result<u8> {
    let reports = PolicyCompiler::default().check_store(&config.tag_definitions);
    if reports.is_empty() {
        println!("WARN: no tag_definitions configured");
        return Ok(0);
    }

    let failed = reports.iter().filter(|r| !r.is_clean()).count();
    println!("Policies: {}/{} passed", reports.len() - failed, reports.len());
    for report in reports.iter().filter(|r| !r.is_clean()) {
        println!("  FAIL: {}", report.tag_type);
        for defect in &report.defects {
            println!("    - {defect}");
        }
    }

    Ok(u8::from(failed > 0))
}

/// Execute `tagging list`.
pub fn run_list(config: &TaggingConfig) -> Result<u8> {
    let compiler = PolicyCompiler::default();
    for record in config.tag_definitions.iter() {
        match compiler.compile(record) {
            Ok(policy) => {
                println!("{}", policy.tag_type());
                for clause in policy.clauses() {
                    println!("  {clause}");
                }
                if let Some(kind) = policy.default_owner_type() {
                    println!("  owner_object: defaults to {}", kind.type_name());
                }
            }
            Err(defect) => println!("{} (malformed: {defect})", record.tag_type()),
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_config_passes() {
        let config = TaggingConfig::from_yaml_str(
            "tag_definitions:\n  - tag_type: a\n    validate_target_object: User\n",
        )
        .unwrap();
        assert_eq!(run_check(&config).unwrap(), 0);
        assert_eq!(run_list(&config).unwrap(), 0);
    }

    #[test]
    fn malformed_policy_fails_check() {
        let config = TaggingConfig::from_yaml_str(
            "tag_definitions:\n  - tag_type: a\n    validate_tag_value:\n      frobnicate: 1\n",
        )
        .unwrap();
        assert_eq!(run_check(&config).unwrap(), 1);
    }

    #[test]
    fn empty_config_is_not_a_failure() {
        assert_eq!(run_check(&TaggingConfig::default()).unwrap(), 0);
    }
}
