//! # Deployment Configuration
//!
//! [`TaggingConfig`] is built once at startup and handed to the engine and
//! the lifecycle service. There is no global settings object.
//!
//! ```yaml
//! tag_definitions:
//!   - tag_type: example_tag_1
//!     validate_tag_value: { in: [v1, v2] }
//!     validate_target_object: User
//! resolver:
//!   timeout_ms: 2000
//! default_site: "1"
//! directory:
//!   base_url: https://lms.example.com/api/directory/v1/
//!   api_token: secret
//! ```
//!
//! ## Environment Overrides
//!
//! - `TAGGING_CONFIG`: path of the file read by [`TaggingConfig::load()`]
//! - `TAGGING_RESOLVER_TIMEOUT_MS`
//! - `TAGGING_DEFAULT_SITE`
//! - `TAGGING_DIRECTORY_URL`
//! - `TAGGING_DIRECTORY_TOKEN`

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use tagging_policy::PolicyStore;
use tagging_resolver::HttpDirectoryConfig;

/// Path of the configuration file.
pub const ENV_CONFIG: &str = "TAGGING_CONFIG";
/// Resolver timeout in milliseconds.
pub const ENV_RESOLVER_TIMEOUT_MS: &str = "TAGGING_RESOLVER_TIMEOUT_MS";
/// Default owner site.
pub const ENV_DEFAULT_SITE: &str = "TAGGING_DEFAULT_SITE";
/// Directory API root.
pub const ENV_DIRECTORY_URL: &str = "TAGGING_DIRECTORY_URL";
/// Directory bearer token.
pub const ENV_DIRECTORY_TOKEN: &str = "TAGGING_DIRECTORY_TOKEN";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `TAGGING_CONFIG` is not set.
    #[error("TAGGING_CONFIG environment variable is required")]
    MissingConfigPath,

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid, including policy load errors such as a
    /// duplicate tag type.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A setting has an unusable value.
    #[error("invalid value for {name}: \"{value}\" ({reason})")]
    InvalidValue {
        /// Setting or variable name.
        name: String,
        /// The offending value.
        value: String,
        /// What is wrong.
        reason: String,
    },
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolverSettings {
    /// Per-lookup bound in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// HTTP directory settings. `Debug` redacts the token.
#[derive(Clone, Deserialize)]
pub struct DirectorySettings {
    /// API root URL.
    pub base_url: String,
    /// Bearer token.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl std::fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaggingConfig {
    /// One policy record per tag type.
    #[serde(default)]
    pub tag_definitions: PolicyStore,
    /// Resolver settings.
    #[serde(default)]
    pub resolver: ResolverSettings,
    /// Site that owns tags created without an owner.
    #[serde(default)]
    pub default_site: Option<String>,
    /// HTTP directory backend; absent means no remote directory.
    #[serde(default)]
    pub directory: Option<DirectorySettings>,
}

impl TaggingConfig {
    /// Parse a YAML (or JSON) document.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Read the file named by `TAGGING_CONFIG` and apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(ENV_CONFIG).map_err(|_| ConfigError::MissingConfigPath)?;
        let mut config = Self::from_path(Path::new(&path))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `TAGGING_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_RESOLVER_TIMEOUT_MS) {
            self.resolver.timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_RESOLVER_TIMEOUT_MS.to_string(),
                value: raw.clone(),
                reason: "expected milliseconds".to_string(),
            })?;
        }
        if let Some(site) = lookup(ENV_DEFAULT_SITE) {
            self.default_site = Some(site);
        }
        if let Some(base_url) = lookup(ENV_DIRECTORY_URL) {
            let api_token = self.directory.take().and_then(|d| d.api_token);
            self.directory = Some(DirectorySettings { base_url, api_token });
        }
        if let Some(token) = lookup(ENV_DIRECTORY_TOKEN) {
            if let Some(directory) = self.directory.as_mut() {
                directory.api_token = Some(token);
            }
        }
        self.check()
    }

    /// The resolver timeout.
    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver.timeout_ms)
    }

    /// Settings for the HTTP directory, if one is configured.
    pub fn http_directory(&self) -> Result<Option<HttpDirectoryConfig>, ConfigError> {
        let Some(directory) = &self.directory else {
            return Ok(None);
        };
        let base_url = Url::parse(&directory.base_url).map_err(|e| ConfigError::InvalidValue {
            name: "directory.base_url".to_string(),
            value: directory.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(HttpDirectoryConfig {
            base_url,
            api_token: directory.api_token.clone(),
            timeout: self.resolver_timeout(),
        }))
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.resolver.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "resolver.timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if matches!(&self.default_site, Some(site) if site.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                name: "default_site".to_string(),
                value: String::new(),
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CONFIG: &str = r#"
tag_definitions:
  - tag_type: example_tag_1
    validate_tag_value:
      in: [v1, v2]
    validate_target_object: User
resolver:
  timeout_ms: 250
default_site: "1"
directory:
  base_url: http://127.0.0.1:9000/api/
  api_token: secret-token
"#;

    #[test]
    fn parses_full_document() {
        let cfg = TaggingConfig::from_yaml_str(CONFIG).unwrap();
        assert_eq!(cfg.tag_definitions.len(), 1);
        assert_eq!(cfg.resolver_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.default_site.as_deref(), Some("1"));
        let http = cfg.http_directory().unwrap().unwrap();
        assert_eq!(http.base_url.as_str(), "http://127.0.0.1:9000/api/");
        assert_eq!(http.timeout, Duration::from_millis(250));
    }

    #[test]
    fn defaults_apply_to_empty_document() {
        let cfg = TaggingConfig::from_yaml_str("{}").unwrap();
        assert!(cfg.tag_definitions.is_empty());
        assert_eq!(cfg.resolver.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(cfg.http_directory().unwrap().is_none());
    }

    #[test]
    fn duplicate_tag_type_fails_to_load() {
        let err = TaggingConfig::from_yaml_str(
            "tag_definitions:\n  - tag_type: a\n  - tag_type: a\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = TaggingConfig::from_yaml_str("resolver:\n  timeout_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = TaggingConfig::from_yaml_str(CONFIG).unwrap();
        let vars: HashMap<&str, &str> = [
            (ENV_RESOLVER_TIMEOUT_MS, "1000"),
            (ENV_DEFAULT_SITE, "example.com"),
            (ENV_DIRECTORY_URL, "http://10.0.0.1/dir/"),
        ]
        .into_iter()
        .collect();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.resolver.timeout_ms, 1000);
        assert_eq!(cfg.default_site.as_deref(), Some("example.com"));
        let dir = cfg.directory.as_ref().unwrap();
        assert_eq!(dir.base_url, "http://10.0.0.1/dir/");
        assert_eq!(dir.api_token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn bad_timeout_override_is_rejected() {
        let mut cfg = TaggingConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == ENV_RESOLVER_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn debug_redacts_directory_token() {
        let cfg = TaggingConfig::from_yaml_str(CONFIG).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn reads_config_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), CONFIG).unwrap();
        let cfg = TaggingConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.tag_definitions.len(), 1);
    }

    #[test]
    fn invalid_directory_url_is_reported() {
        let cfg = TaggingConfig::from_yaml_str("directory:\n  base_url: not a url\n").unwrap();
        assert!(matches!(cfg.http_directory(), Err(ConfigError::InvalidValue { .. })));
    }
}
