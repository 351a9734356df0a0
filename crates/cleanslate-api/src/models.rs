//! Request and response documents exposed over HTTP.

use std::path::Path;

use chrono::{DateTime, Utc};
use cleanslate_core::{
    AuditStatus, FailureKind, MetadataMap, ProcessingResult, RemovedMetadata, RunState, Stage,
};
use cleanslate_events::EventEnvelope;
use cleanslate_pipeline::{BackupReceipt, PipelineStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::ServiceSummary;

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    /// Detailed diagnostic message when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// `x-request-id` of the failed request, for correlating with logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Build identifier.
    pub build: String,
}

/// `GET /status` body.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// `running` or `degraded`.
    pub status: &'static str,
    /// Time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Build identifier.
    pub build: String,
    /// Configured services.
    pub services: ServiceSummary,
    /// Pipeline counters.
    pub pipeline: PipelineStatus,
    /// Degraded components.
    pub degraded: Vec<String>,
    /// Most recent domain events, oldest first.
    pub recent_events: Vec<EventEnvelope>,
}

/// Query flags accepted by `POST /sanitize`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SanitizeQuery {
    /// Preview only.
    #[serde(default)]
    pub dry_run: bool,
    /// The caller confirmed the run.
    #[serde(default)]
    pub confirm: bool,
    /// Backup destination override (`name:path`).
    #[serde(default)]
    pub remote: Option<String>,
}

/// Query accepted by `POST /backup`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BackupQuery {
    /// Local file to upload.
    pub file_path: String,
    /// Destination (`name:path`); defaults to the configured remote.
    #[serde(default)]
    pub remote: Option<String>,
}

/// Failure section of a sanitize response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureView {
    /// Stage that failed.
    pub stage: Stage,
    /// Failure classification.
    pub kind: FailureKind,
    /// Description.
    pub message: String,
    /// Stages that completed before the failure.
    pub completed_stages: Vec<Stage>,
    /// Remote copy of the original, when one exists.
    pub remote: Option<String>,
}

/// `POST /sanitize` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SanitizeResponse {
    /// Whether every attempted stage succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Final location of the file, or the uploaded file name when the file
    /// was not relocated.
    pub file_path: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Metadata before stripping.
    pub metadata_before: MetadataMap,
    /// Metadata after stripping.
    pub metadata_after: Option<MetadataMap>,
    /// Fields removed by stripping.
    pub removed_metadata: RemovedMetadata,
    /// Shareable link to the backed-up original.
    pub remote_link: Option<String>,
    /// Remote copy reference.
    pub remote: Option<String>,
    /// Run identifier.
    pub run_id: Uuid,
    /// Final run state.
    pub state: RunState,
    /// Whether the run was a preview.
    pub dry_run: bool,
    /// Preview awaiting a confirmed resubmission.
    pub confirmation_required: bool,
    /// Result adopted from a concurrent run.
    pub deduplicated: bool,
    /// Audit outcome.
    pub audit: AuditStatus,
    /// Failure detail when `success` is false.
    pub error: Option<FailureView>,
}

impl SanitizeResponse {
    /// Project the result of an uploaded file into the response document.
    ///
    /// Uploads are staged in a per-request directory that is gone by the time
    /// the client reads the response, so unrelocated files report `file_name`.
    #[must_use]
    pub fn from_upload(result: ProcessingResult, file_name: &str) -> Self {
        let message = summary(&result);
        let file_path = result.final_path.as_deref().map_or_else(
            || file_name.to_string(),
            |path| path.display().to_string(),
        );
        let error = result.failure.map(|failure| FailureView {
            stage: failure.stage,
            kind: failure.kind,
            message: failure.message,
            completed_stages: failure.completed_stages,
            remote: failure.remote_ref.map(|remote| remote.to_string()),
        });
        Self {
            success: result.success,
            message,
            file_path,
            file_size: result.file_size,
            metadata_before: result.metadata_before,
            metadata_after: result.metadata_after,
            removed_metadata: result.removed_metadata,
            remote_link: result.share_link,
            remote: result.remote_ref.map(|remote| remote.to_string()),
            run_id: result.run_id,
            state: result.state,
            dry_run: result.dry_run,
            confirmation_required: result.confirmation_required,
            deduplicated: result.deduplicated,
            audit: result.audit,
            error,
        }
    }
}

fn summary(result: &ProcessingResult) -> String {
    match &result.failure {
        None if result.dry_run => format!(
            "Metadata preview for {}: {} field(s) found; resubmit with confirm=true to sanitize",
            file_label(&result.source_path),
            result.metadata_before.len()
        ),
        None => "File sanitized successfully".to_string(),
        Some(failure) => match &failure.remote_ref {
            Some(remote) => format!("{} (original backed up to {remote})", failure.message),
            None => failure.message.clone(),
        },
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// `POST /backup` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupResponse {
    /// Always true; failures use problem documents.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Uploaded file.
    pub file_path: String,
    /// Remote copy.
    pub remote: String,
    /// Shareable link, when available.
    pub remote_link: Option<String>,
    /// Upload attempts spent.
    pub attempts: u32,
}

impl From<BackupReceipt> for BackupResponse {
    fn from(receipt: BackupReceipt) -> Self {
        Self {
            success: true,
            message: "File backed up successfully".to_string(),
            file_path: receipt.file_path.display().to_string(),
            remote: receipt.remote_ref.to_string(),
            remote_link: receipt.share_link,
            attempts: receipt.attempts,
        }
    }
}
