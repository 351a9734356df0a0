use std::path::PathBuf;

use chrono::{DateTime, Utc};
use cleanslate_events::StageStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::identity::FileIdentity;
use crate::model::metadata::{MetadataMap, RemovedMetadata};
use crate::model::remote::{RemoteRef, RemoteTarget};

/// Identifier returned by the audit sink for a stored record.
pub type RecordId = String;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Read metadata without modifying the file.
    Inspect,
    /// Upload the untouched original to remote storage.
    Backup,
    /// Strip metadata from the local file.
    Sanitize,
    /// Move the sanitized file into the output directory.
    Relocate,
    /// Write the transaction record to the audit sink.
    Audit,
}

impl Stage {
    /// Stable label used in logs, metrics and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inspect => "inspect",
            Self::Backup => "backup",
            Self::Sanitize => "sanitize",
            Self::Relocate => "relocate",
            Self::Audit => "audit",
        }
    }
}

/// Position of a run in its state machine.
///
/// Successful runs advance `Inspected → BackedUp → Sanitized → Relocated →
/// Audited`; the `*Failed` states are terminal for the run that reached them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Metadata was read; previews stop here.
    Inspected,
    /// The original exists remotely.
    BackedUp,
    /// Metadata was stripped locally.
    Sanitized,
    /// The sanitized file reached the output directory.
    Relocated,
    /// The audit record was stored by the sink.
    Audited,
    /// Metadata could not be read; nothing was changed.
    InspectFailed,
    /// Upload failed; the local file is untouched.
    BackupFailed,
    /// Strip failed after a successful backup.
    SanitizeFailed,
    /// Move failed after a successful strip.
    RelocateFailed,
    /// The watcher gave up on the file after repeated failures.
    Abandoned,
}

impl RunState {
    /// Stable label used in logs and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inspected => "inspected",
            Self::BackedUp => "backed_up",
            Self::Sanitized => "sanitized",
            Self::Relocated => "relocated",
            Self::Audited => "audited",
            Self::InspectFailed => "inspect_failed",
            Self::BackupFailed => "backup_failed",
            Self::SanitizeFailed => "sanitize_failed",
            Self::RelocateFailed => "relocate_failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Terminal failure state reached when `stage` fails.
    #[must_use]
    pub const fn failed_at(stage: Stage) -> Self {
        match stage {
            Stage::Inspect => Self::InspectFailed,
            Stage::Backup => Self::BackupFailed,
            Stage::Sanitize => Self::SanitizeFailed,
            Stage::Relocate => Self::RelocateFailed,
            Stage::Audit => Self::Audited,
        }
    }

    /// State reached once `stage` completes.
    #[must_use]
    pub const fn completed(stage: Stage) -> Self {
        match stage {
            Stage::Inspect => Self::Inspected,
            Stage::Backup => Self::BackedUp,
            Stage::Sanitize => Self::Sanitized,
            Stage::Relocate => Self::Relocated,
            Stage::Audit => Self::Audited,
        }
    }
}

/// Timeline entry for one stage of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage the entry describes.
    pub stage: Stage,
    /// Latest status of the stage.
    pub status: StageStatus,
    /// Optional human-readable detail.
    pub detail: Option<String>,
    /// Collaborator attempts spent in the stage.
    pub attempts: u32,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage reached its final status.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Classification of a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Collaborator failed transiently and retries were exhausted.
    Transient,
    /// Collaborator failed fatally.
    Fatal,
    /// Local filesystem operation failed.
    Local,
    /// The run was interrupted by shutdown between stages.
    Aborted,
}

/// Failure detail attached to a result.
///
/// Always discloses which stages already produced side effects, and the remote
/// copy when one exists, so callers can recover the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFailure {
    /// Stage that failed (or the next stage when aborted).
    pub stage: Stage,
    /// Failure classification.
    pub kind: FailureKind,
    /// Description of the failure.
    pub message: String,
    /// Stages that completed before the failure.
    pub completed_stages: Vec<Stage>,
    /// Remote copy of the original, when the backup stage completed.
    pub remote_ref: Option<RemoteRef>,
}

impl PipelineFailure {
    /// Whether an earlier stage produced a durable side effect.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.completed_stages
            .iter()
            .any(|stage| !matches!(stage, Stage::Inspect))
    }
}

/// Outcome of the audit stage as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditStatus {
    /// No record was submitted (previews and failures before audit).
    #[default]
    NotAttempted,
    /// The sink stored the record.
    Recorded {
        /// Identifier returned by the sink.
        record_id: RecordId,
    },
    /// The write failed transiently and the record waits in the retry queue.
    Queued,
    /// The write failed fatally; the record was logged and discarded.
    Failed {
        /// Failure description.
        reason: String,
    },
}

/// Kind of audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A pipeline run.
    Run,
    /// The watcher abandoned the file after repeated failures.
    Abandoned,
}

/// Immutable audit entry for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Identifier of the run.
    pub run_id: Uuid,
    /// Record kind.
    pub kind: RecordKind,
    /// File identity the run processed.
    pub identity: FileIdentity,
    /// File name of the original.
    pub file_name: String,
    /// Lower-cased extension including the dot.
    pub file_type: String,
    /// SHA-256 of the original bytes, when read.
    pub content_sha256: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the record was assembled.
    pub finished_at: DateTime<Utc>,
    /// State the run ended in.
    pub state: RunState,
    /// Per-stage timeline.
    pub stages: Vec<StageRecord>,
    /// Metadata before stripping.
    pub metadata_before: MetadataMap,
    /// Metadata after stripping.
    pub metadata_after: Option<MetadataMap>,
    /// Fields removed by stripping.
    pub removed_metadata: RemovedMetadata,
    /// Remote copy of the original.
    pub remote_ref: Option<RemoteRef>,
    /// Final location of the sanitized file.
    pub final_path: Option<PathBuf>,
    /// Failure description for unsuccessful runs.
    pub failure: Option<String>,
    /// Failed attempts, for abandoned files.
    pub attempts: Option<u32>,
}

impl TransactionRecord {
    /// Whether an untouched copy of the original exists remotely.
    #[must_use]
    pub const fn original_backed_up(&self) -> bool {
        self.remote_ref.is_some()
    }
}

/// Caller-supplied options for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Inspect only; no side effects.
    pub dry_run: bool,
    /// The caller already confirmed; previews need no follow-up prompt.
    pub auto_confirm: bool,
    /// Backup destination overriding the configured default.
    pub remote_override: Option<RemoteTarget>,
}

/// Synchronous result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Identifier of the run.
    pub run_id: Uuid,
    /// File identity processed.
    pub identity: FileIdentity,
    /// Whether every stage the run attempted succeeded.
    pub success: bool,
    /// Final state of the run.
    pub state: RunState,
    /// Whether the run was a preview.
    pub dry_run: bool,
    /// Preview awaiting an explicit follow-up run.
    pub confirmation_required: bool,
    /// Adopted from a concurrent run of the same identity.
    pub deduplicated: bool,
    /// Path the run was asked to process.
    pub source_path: PathBuf,
    /// Location of the sanitized file once relocated.
    pub final_path: Option<PathBuf>,
    /// Size in bytes of the file as last observed.
    pub file_size: u64,
    /// Metadata before stripping.
    pub metadata_before: MetadataMap,
    /// Metadata after stripping.
    pub metadata_after: Option<MetadataMap>,
    /// Fields removed by stripping.
    pub removed_metadata: RemovedMetadata,
    /// Remote copy of the original.
    pub remote_ref: Option<RemoteRef>,
    /// Shareable link for the remote copy.
    pub share_link: Option<String>,
    /// Failure detail when `success` is false.
    pub failure: Option<PipelineFailure>,
    /// Outcome of the audit stage.
    pub audit: AuditStatus,
    /// Per-stage timeline.
    pub stages: Vec<StageRecord>,
}
