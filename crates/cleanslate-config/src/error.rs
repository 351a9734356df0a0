//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable contained a value that could not be accepted.
    #[error("invalid configuration field")]
    InvalidField {
        /// Environment variable that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A file referenced by configuration does not exist.
    #[error("configured file does not exist")]
    MissingFile {
        /// Environment variable naming the file.
        field: &'static str,
        /// Path that was checked.
        path: PathBuf,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: Some(value.to_string()),
            reason,
        }
    }

    /// Environment variable associated with the error.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidField { field, .. } | Self::MissingFile { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_exposes_field() {
        let err = ConfigError::invalid("DAEMON_MODE", "maybe", "expected boolean");
        assert_eq!(err.field(), "DAEMON_MODE");
        assert_eq!(err.to_string(), "invalid configuration field");

        let missing = ConfigError::MissingFile {
            field: "FIREBASE_CREDENTIALS",
            path: PathBuf::from("/nope.json"),
        };
        assert_eq!(missing.field(), "FIREBASE_CREDENTIALS");
    }
}
