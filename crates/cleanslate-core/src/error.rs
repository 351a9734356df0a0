//! Error types shared by collaborators and the domain model.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by an external collaborator (rclone, exiftool, audit sink).
///
/// The two kinds drive retry behaviour: transient failures are retried with
/// backoff, fatal failures surface immediately.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Network or process hiccup; the same call may succeed later.
    #[error("transient collaborator failure")]
    Transient {
        /// Operation identifier (`upload`, `strip`, ...).
        operation: &'static str,
        /// Collaborator-provided detail.
        detail: String,
    },
    /// Misconfiguration or invalid input; retrying cannot help.
    #[error("fatal collaborator failure")]
    Fatal {
        /// Operation identifier (`upload`, `strip`, ...).
        operation: &'static str,
        /// Collaborator-provided detail.
        detail: String,
    },
}

impl CollaboratorError {
    /// Construct a transient failure.
    #[must_use]
    pub fn transient(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Transient {
            operation,
            detail: detail.into(),
        }
    }

    /// Construct a fatal failure.
    #[must_use]
    pub fn fatal(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Fatal {
            operation,
            detail: detail.into(),
        }
    }

    /// A call that exceeded its timeout; treated as transient.
    #[must_use]
    pub fn timeout(operation: &'static str, limit: Duration) -> Self {
        Self::transient(
            operation,
            format!("timed out after {}s", limit.as_secs_f64()),
        )
    }

    /// Whether the call may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Operation identifier.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Transient { operation, .. } | Self::Fatal { operation, .. } => operation,
        }
    }

    /// Collaborator-provided detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Transient { detail, .. } | Self::Fatal { detail, .. } => detail,
        }
    }
}

/// Result alias for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Validation failures for domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// File extension is not one the pipeline handles.
    #[error("unsupported file type")]
    UnsupportedFileType {
        /// Offending path.
        path: PathBuf,
        /// Lower-cased extension including the dot, if any.
        extension: Option<String>,
    },
    /// Remote specification could not be parsed.
    #[error("invalid remote specification")]
    InvalidRemote {
        /// Raw value supplied by the caller.
        value: String,
        /// Machine-readable reason.
        reason: &'static str,
    },
}

/// Result alias for domain validation.
pub type ModelResult<T> = Result<T, ModelError>;
