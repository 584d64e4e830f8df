//! # tagging-cli: The `tagging` Command
//!
//! ## Subcommands
//!
//! - `tagging check`: compile every configured policy and report all
//!   defects. Exit 1 when any policy is malformed.
//! - `tagging list`: print each tag type with its compiled clauses.
//! - `tagging validate`: run a candidate tag through the full engine
//!   against directory fixtures (or the configured HTTP directory).
//!
//! ```bash
//! tagging --config tagging.yaml check
//! tagging --config tagging.yaml validate --candidate tag.yaml --fixtures directory.yaml
//! ```
//!
//! Without `--config`, the file named by `TAGGING_CONFIG` is used.
//! `TAGGING_*` overrides apply in both cases.

pub mod check;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use tagging_engine::TaggingConfig;

/// Load configuration from `path`, or from `TAGGING_CONFIG` when absent.
pub fn load_config(path: Option<&Path>) -> Result<TaggingConfig> {
    let Some(path) = path else {
        return TaggingConfig::load().context("failed to load configuration from TAGGING_CONFIG");
    };
    let mut config = TaggingConfig::from_path(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    config
        .apply_env_overrides()
        .context("invalid TAGGING_* environment override")?;
    tracing::debug!(tag_types = config.tag_definitions.len(), "configuration loaded");
    Ok(config)
}
