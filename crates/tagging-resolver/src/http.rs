//! # HTTP Directory
//!
//! A [`ReferenceBackend`] backed by the system of record's REST API.
//!
//! | Lookup | Path |
//! |--------|------|
//! | user | `GET {base}/users/{username}` |
//! | course | `GET {base}/courses/{course_id}` |
//! | enrollment | `GET {base}/enrollments/{username}/{course_id}` |
//! | site | `GET {base}/sites/{site_id}` |
//!
//! `404` means the entity does not exist. Any other non-success status, a
//! transport failure, or an undecodable body is a [`BackendError`]. Path
//! segments are percent-encoded, so course keys may be passed as-is.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::backend::ReferenceBackend;
use crate::entity::{CourseRecord, EnrollmentRecord, SiteRecord, UserRecord};
use crate::error::{BackendError, DirectoryError};

/// Connection settings for [`HttpDirectory`].
///
/// `Debug` redacts the token.
#[derive(Clone)]
pub struct HttpDirectoryConfig {
    /// API root, e.g. `https://lms.example.com/api/directory/v1/`.
    pub base_url: Url,
    /// Bearer token, if the directory requires one.
    pub api_token: Option<String>,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpDirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDirectoryConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// REST-backed directory client.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDirectory {
    /// Build the client.
    pub fn new(config: HttpDirectoryConfig) -> Result<Self, DirectoryError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| DirectoryError::Client("api token is not a valid header value".into()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| DirectoryError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// The API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>, BackendError> {
        let url = self.url_for(segments)?;
        let endpoint = format!("GET {}", url.path());

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                endpoint,
                status,
                body,
            });
        }

        resp.json()
            .await
            .map(Some)
            .map_err(|e| BackendError::Deserialization {
                endpoint,
                source: e,
            })
    }
}

#[async_trait]
impl ReferenceBackend for HttpDirectory {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, BackendError> {
        self.fetch(&["users", username]).await
    }

    async fn lookup_course(&self, course_id: &str) -> Result<Option<CourseRecord>, BackendError> {
        self.fetch(&["courses", course_id]).await
    }

    async fn lookup_enrollment(
        &self,
        username: &str,
        course_id: &str,
    ) -> Result<Option<EnrollmentRecord>, BackendError> {
        self.fetch(&["enrollments", username, course_id]).await
    }

    async fn lookup_site(&self, site_id: &str) -> Result<Option<SiteRecord>, BackendError> {
        self.fetch(&["sites", site_id]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(base: &str) -> HttpDirectory {
        HttpDirectory::new(HttpDirectoryConfig {
            base_url: Url::parse(base).unwrap(),
            api_token: Some("secret-token".into()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn url_for_appends_segments_under_base_path() {
        let dir = directory("http://127.0.0.1:9000/api/v1/");
        let url = dir.url_for(&["users", "alice"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/v1/users/alice");
    }

    #[test]
    fn url_for_escapes_slashes_in_keys() {
        let dir = directory("http://127.0.0.1:9000");
        let url = dir.url_for(&["courses", "Org/Course/Run"]).unwrap();
        assert_eq!(url.path(), "/courses/Org%2FCourse%2FRun");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = HttpDirectoryConfig {
            base_url: Url::parse("http://127.0.0.1:9000").unwrap(),
            api_token: Some("secret-token".into()),
            timeout: Duration::from_secs(1),
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
