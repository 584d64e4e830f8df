//! # tagging-engine: Tag Validation and Lifecycle
//!
//! Ties policies and reference resolution together:
//!
//! - [`engine`]: the fail-fast [`ValidationEngine`].
//! - [`error`]: the [`Rejection`] taxonomy plus storage and service errors.
//! - [`store`]: the [`TagStore`] capability and an in-memory store.
//! - [`service`]: [`TagService`], the create / invalidate / purge lifecycle.
//! - [`config`]: [`TaggingConfig`], loaded once at startup.
//!
//! ## Wiring
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use tagging_engine::{InMemoryTagStore, TagService, TaggingConfig};
//! use tagging_resolver::InMemoryDirectory;
//!
//! let config = TaggingConfig::load()?;
//! let service = tagging_engine::build_service(&config, Arc::new(InMemoryDirectory::new()), Arc::new(InMemoryTagStore::new()));
//! # let _ = service;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;

use std::sync::Arc;

pub use config::{ConfigError, DirectorySettings, ResolverSettings, TaggingConfig};
pub use engine::{Valid, ValidationEngine, ValidationState};
pub use error::{Rejection, ServiceError, StoreError};
pub use service::TagService;
pub use store::{InMemoryTagStore, TagQuery, TagStore};

use tagging_policy::PolicyCompiler;
use tagging_resolver::{ReferenceBackend, ReferenceResolver};

/// Build an engine from configuration over `backend`.
pub fn build_engine(config: &TaggingConfig, backend: Arc<dyn ReferenceBackend>) -> ValidationEngine {
    let resolver = ReferenceResolver::new(backend).with_timeout(config.resolver_timeout());
    ValidationEngine::new(&config.tag_definitions, &PolicyCompiler::default(), resolver)
}

/// Build a lifecycle service from configuration.
pub fn build_service(
    config: &TaggingConfig,
    backend: Arc<dyn ReferenceBackend>,
    store: Arc<dyn TagStore>,
) -> TagService {
    let service = TagService::new(Arc::new(build_engine(config, backend)), store);
    match &config.default_site {
        Some(site) => service.with_default_site(site.clone()),
        None => service,
    }
}
