//! # Validate Subcommand
//!
//! Runs one candidate tag through the lifecycle service exactly as a live
//! deployment would: default owner site, policy clauses, then reference
//! resolution. Nothing is persisted beyond an in-memory store that is
//! dropped on exit.
//!
//! The candidate file is a tag draft:
//!
//! ```yaml
//! tag_type: example_tag_1
//! tag_value: v1
//! access: PRIVATE
//! target:
//!   entity: { type: user, username: alice }
//! owner: { type: user, username: bob }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use tagging_core::TagDraft;
use tagging_engine::{build_service, InMemoryTagStore, ServiceError, TaggingConfig};
use tagging_resolver::{HttpDirectory, InMemoryDirectory, ReferenceBackend};

/// Arguments for `tagging validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Candidate tag draft (YAML or JSON).
    #[arg(long, value_name = "PATH")]
    pub candidate: PathBuf,

    /// Directory fixtures to resolve references against. Without this,
    /// the configured HTTP directory is used.
    #[arg(long, value_name = "PATH")]
    pub fixtures: Option<PathBuf>,

    /// Override the resolver timeout.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute `tagging validate`.
///
/// Returns exit code: 0 when accepted, 1 when rejected.
pub fn run_validate(args: &ValidateArgs, config: &TaggingConfig) -> Result<u8> {
    let source = std::fs::read_to_string(&args.candidate)
        .with_context(|| format!("failed to read {}", args.candidate.display()))?;
    let draft: TagDraft = serde_yaml::from_str(&source)
        .with_context(|| format!("{} is not a valid tag draft", args.candidate.display()))?;

    let mut config = config.clone();
    if let Some(ms) = args.timeout_ms {
        if ms == 0 {
            bail!("--timeout-ms must be positive");
        }
        config.resolver.timeout_ms = ms;
    }

    let backend = directory_backend(args, &config)?;
    let service = build_service(&config, backend, Arc::new(InMemoryTagStore::new()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcome = runtime.block_on(service.create(draft));

    match outcome {
        Ok(tag) => {
            if args.json {
                let body = serde_json::json!({ "accepted": true, "tag": tag });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("ACCEPTED: {} ({})", tag.tag_type, tag.key());
                print!("{}", serde_yaml::to_string(&tag)?);
            }
            Ok(0)
        }
        Err(ServiceError::Rejected(rejection)) => {
            if args.json {
                let body = serde_json::json!({
                    "accepted": false,
                    "kind": rejection.kind(),
                    "reason": rejection.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("REJECTED [{}]: {rejection}", rejection.kind());
            }
            Ok(1)
        }
        Err(ServiceError::InvalidTag(e)) => {
            println!("REJECTED [invalid_tag]: {e}");
            Ok(1)
        }
        Err(e) => Err(e).context("tag store failure"),
    }
}

fn directory_backend(args: &ValidateArgs, config: &TaggingConfig) -> Result<Arc<dyn ReferenceBackend>> {
    if let Some(path) = &args.fixtures {
        let dir = InMemoryDirectory::from_path(path)
            .with_context(|| format!("failed to load fixtures from {}", path.display()))?;
        tracing::info!(records = dir.len(), "using fixture directory");
        return Ok(Arc::new(dir));
    }
    match config.http_directory()? {
        Some(http) => {
            tracing::info!(base_url = %http.base_url, "using HTTP directory");
            Ok(Arc::new(HttpDirectory::new(http)?))
        }
        None => bail!("no directory available: pass --fixtures or configure `directory`"),
    }
}
