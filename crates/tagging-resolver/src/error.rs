//! Resolver and backend errors.
//!
//! Backends report transport problems as [`BackendError`]. The resolver
//! collapses every transport problem and every timeout into
//! [`ResolveError::Unavailable`]; a missing entity stays a distinct
//! [`ResolveError::NotFound`].

use tagging_core::EntityType;
use thiserror::Error;

/// A backend could not answer.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The request could not be sent or the connection failed.
    #[error("request to {endpoint} failed: {source}")]
    Http {
        /// Method and path.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The directory answered with an unexpected status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        /// Method and path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body did not decode.
    #[error("could not decode response from {endpoint}: {source}")]
    Deserialization {
        /// Method and path.
        endpoint: String,
        /// Decoder error.
        #[source]
        source: reqwest::Error,
    },

    /// The request URL could not be built from the base URL.
    #[error("invalid directory URL: {0}")]
    InvalidUrl(String),

    /// Any other backend failure.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors loading directory fixtures or building a backend.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The fixture file could not be read.
    #[error("failed to read fixtures from {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The fixtures are not valid YAML.
    #[error("invalid fixture document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Why a reference did not resolve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The entity does not exist in the system of record.
    #[error("{entity_type} \"{key}\" does not exist")]
    NotFound {
        /// Entity type looked up.
        entity_type: EntityType,
        /// Lookup key.
        key: String,
    },

    /// The backend was unreachable, failed, or timed out.
    #[error("{entity_type} lookup for \"{key}\" unavailable: {reason}")]
    Unavailable {
        /// Entity type looked up.
        entity_type: EntityType,
        /// Lookup key.
        key: String,
        /// Transport or timeout detail.
        reason: String,
    },

    /// The reference has no backing entity type.
    #[error("no resolver backend for {0}")]
    UnsupportedEntityType(String),

    /// The lookup key is not in the form the entity type needs.
    #[error("malformed {entity_type} lookup key \"{key}\"")]
    MalformedKey {
        /// Entity type looked up.
        entity_type: EntityType,
        /// Lookup key.
        key: String,
    },
}
