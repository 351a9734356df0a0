//! Shared error type, configuration loading and HTTP client for the CLI.

use std::time::Duration;

use anyhow::anyhow;
use cleanslate_app::AppError;
use cleanslate_config::{AppConfig, ConfigError};
use cleanslate_pipeline::PipelineError;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use thiserror::Error;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("validation failed")]
    Validation(String),
    #[error("command failed")]
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::UnsupportedFileType { .. }
            | PipelineError::FileNotFound { .. }
            | PipelineError::NotAFile { .. }
            | PipelineError::InvalidRemote { .. } => Self::Validation(describe_pipeline(&err)),
            _ => Self::Failure(anyhow!(describe_pipeline(&err))),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match &err {
            ConfigError::InvalidField {
                field,
                value,
                reason,
            } => Self::Validation(format!(
                "invalid {field}={}: {reason}",
                value.as_deref().unwrap_or("")
            )),
            ConfigError::MissingFile { field, path } => Self::Validation(format!(
                "{field} points to a missing file: {}",
                path.display()
            )),
        }
    }
}

impl From<AppError> for CliError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Config { source, .. } => source.into(),
            AppError::Pipeline { source, .. } => source.into(),
            other => Self::Failure(anyhow::Error::new(other)),
        }
    }
}

/// Human-readable description of a pipeline input error.
pub(crate) fn describe_pipeline(err: &PipelineError) -> String {
    match err {
        PipelineError::UnsupportedFileType { extension, .. } => format!(
            "Unsupported file type: {}. Supported types: {}",
            extension.as_deref().unwrap_or("<none>"),
            cleanslate_core::supported_list()
        ),
        PipelineError::FileNotFound { path } => format!("File not found: {}", path.display()),
        PipelineError::NotAFile { path } => format!("Not a regular file: {}", path.display()),
        PipelineError::InvalidRemote { value, reason } => {
            format!("Invalid remote '{value}': {reason}")
        }
        PipelineError::Backup { attempts, source } => format!(
            "Backup failed after {attempts} attempt(s): {}",
            source.detail()
        ),
        PipelineError::Io {
            operation,
            path,
            source,
        } => format!("{operation} failed for {}: {source}", path.display()),
        PipelineError::Glob { pattern, source } => {
            format!("Invalid ignore pattern '{pattern}': {source}")
        }
    }
}

/// Load configuration from the environment, mapping failures to exit code 2.
pub(crate) fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::from_env()?)
}

/// HTTP client carrying a request id on every call.
pub(crate) fn http_client(request_id: &str, timeout: Duration) -> CliResult<Client> {
    let mut default_headers = HeaderMap::new();
    let request_id = HeaderValue::from_str(request_id)
        .map_err(|_| CliError::failure(anyhow!("request identifier contains invalid characters")))?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);
    Client::builder()
        .timeout(timeout)
        .default_headers(default_headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn input_errors_are_validation_failures() {
        let err: CliError = PipelineError::UnsupportedFileType {
            path: PathBuf::from("notes.txt"),
            extension: Some(".txt".into()),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains(".jpg"));

        let err: CliError = PipelineError::FileNotFound {
            path: PathBuf::from("/missing.jpg"),
        }
        .into();
        assert_eq!(err.display_message(), "File not found: /missing.jpg");
    }

    #[test]
    fn backup_failures_are_runtime_failures() {
        let err: CliError = PipelineError::Backup {
            attempts: 3,
            source: cleanslate_core::CollaboratorError::transient("upload", "exit code 5"),
        }
        .into();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.display_message(),
            "Backup failed after 3 attempt(s): exit code 5"
        );
    }

    #[test]
    fn config_errors_name_the_variable() {
        let err: CliError = ConfigError::MissingFile {
            field: "FIREBASE_CREDENTIALS",
            path: PathBuf::from("/app/creds.json"),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("FIREBASE_CREDENTIALS"));
    }
}
