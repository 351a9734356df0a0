//! # Design
//!
//! - Errors cover input rejected before any side effect and watcher setup.
//! - Stage failures are not errors; they are folded into `ProcessingResult`.
//! - Context lives in fields, messages stay constant.

use std::io;
use std::path::{Path, PathBuf};

use cleanslate_core::{CollaboratorError, ModelError};
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors produced by the pipeline and its front doors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The file extension is not handled.
    #[error("unsupported file type")]
    UnsupportedFileType {
        /// Offending path.
        path: PathBuf,
        /// Lower-cased extension, if any.
        extension: Option<String>,
    },
    /// The file does not exist.
    #[error("file not found")]
    FileNotFound {
        /// Missing path.
        path: PathBuf,
    },
    /// The path exists but is not a regular file.
    #[error("path is not a regular file")]
    NotAFile {
        /// Offending path.
        path: PathBuf,
    },
    /// IO failure while interacting with the filesystem.
    #[error("pipeline io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Ignore pattern failed to compile.
    #[error("invalid ignore pattern")]
    Glob {
        /// Pattern that failed.
        pattern: String,
        /// Underlying globset error.
        #[source]
        source: globset::Error,
    },
    /// Remote override could not be parsed.
    #[error("invalid remote specification")]
    InvalidRemote {
        /// Raw value supplied by the caller.
        value: String,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// A standalone backup failed.
    #[error("backup failed")]
    Backup {
        /// Attempts made before giving up.
        attempts: u32,
        /// Final collaborator error.
        #[source]
        source: CollaboratorError,
    },
}

impl PipelineError {
    pub(crate) fn io(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Classify the metadata lookup of a candidate path.
    pub(crate) fn from_stat(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::io("stat", path, source)
        }
    }
}

impl From<ModelError> for PipelineError {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::UnsupportedFileType { path, extension } => {
                Self::UnsupportedFileType { path, extension }
            }
            ModelError::InvalidRemote { value, reason } => Self::InvalidRemote { value, reason },
        }
    }
}
