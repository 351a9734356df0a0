//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or was invalid.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: cleanslate_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: cleanslate_telemetry::TelemetryError,
    },
    /// A production collaborator could not be constructed.
    #[error("collaborator setup failed")]
    Adapter {
        /// Operation identifier.
        operation: &'static str,
        /// Source adapter error.
        source: cleanslate_adapters::AdapterError,
    },
    /// Pipeline components failed to start.
    #[error("pipeline operation failed")]
    Pipeline {
        /// Operation identifier.
        operation: &'static str,
        /// Source pipeline error.
        source: cleanslate_pipeline::PipelineError,
    },
    /// The HTTP server stopped with an error.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying server error.
        detail: String,
    },
    /// A background task panicked or was cancelled.
    #[error("background task failed")]
    Task {
        /// Task name.
        task: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: cleanslate_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: cleanslate_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn adapter(
        operation: &'static str,
        source: cleanslate_adapters::AdapterError,
    ) -> Self {
        Self::Adapter { operation, source }
    }

    pub(crate) const fn pipeline(
        operation: &'static str,
        source: cleanslate_pipeline::PipelineError,
    ) -> Self {
        Self::Pipeline { operation, source }
    }
}
