//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cleanslate_core::supported_list;
use cleanslate_pipeline::PipelineError;
use cleanslate_telemetry::{current_request_id, current_route};
use tracing::error;

use crate::http::constants::{
    PROBLEM_BACKUP_FAILED, PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND,
    PROBLEM_UNSUPPORTED_TYPE,
};
use crate::models::ProblemDetails;

/// Structured API error rendered as a problem document.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    pub(crate) fn unsupported_type(extension: Option<&str>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            PROBLEM_UNSUPPORTED_TYPE,
            "unsupported file type",
        )
        .with_detail(format!(
            "Unsupported file type: {}. Supported types: {}",
            extension.unwrap_or("<none>"),
            supported_list()
        ))
    }

    pub(crate) fn backup_failed(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BACKUP_FAILED, "backup failed")
            .with_detail(detail)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::UnsupportedFileType { extension, .. } => {
                Self::unsupported_type(extension.as_deref())
            }
            PipelineError::FileNotFound { path } => {
                Self::not_found(format!("File not found: {}", path.display()))
            }
            PipelineError::NotAFile { path } => {
                Self::bad_request(format!("Not a regular file: {}", path.display()))
            }
            PipelineError::InvalidRemote { value, reason } => {
                Self::bad_request(format!("Invalid remote '{value}': {reason}"))
            }
            PipelineError::Backup { attempts, source } => Self::backup_failed(format!(
                "Backup failed after {attempts} attempt(s): {}",
                source.detail()
            )),
            other => {
                error!(
                    error = ?other,
                    request_id = current_request_id().as_deref(),
                    route = current_route().as_deref(),
                    "pipeline request failed"
                );
                Self::internal("pipeline request failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            request_id: current_request_id().filter(|id| !id.is_empty()),
        };
        (self.status, Json(body)).into_response()
    }
}
