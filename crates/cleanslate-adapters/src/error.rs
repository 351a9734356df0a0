//! Errors raised while constructing adapters.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for adapter construction.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Adapter construction failures.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Credentials file could not be read.
    #[error("failed to read credentials file")]
    CredentialsRead {
        /// Credentials path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Credentials file was not valid JSON.
    #[error("failed to parse credentials file")]
    CredentialsParse {
        /// Credentials path.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// Credentials file did not name a project.
    #[error("credentials file has no project_id")]
    MissingProjectId {
        /// Credentials path.
        path: PathBuf,
    },
    /// HTTP client could not be built.
    #[error("failed to build http client")]
    HttpClient {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}
