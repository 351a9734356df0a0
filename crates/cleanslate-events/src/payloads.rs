//! Event payload types emitted by the ingestion pipeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Outcome of a single pipeline stage as reported on the bus.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage began executing.
    Started,
    /// Stage finished successfully.
    Completed,
    /// Stage failed; the run will not advance further.
    Failed,
    /// Stage was not needed for this run.
    Skipped,
}

impl StageStatus {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Typed domain events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A pipeline run acquired its identity lock and started.
    PipelineStarted {
        /// Identifier of the run.
        run_id: Uuid,
        /// Canonical path identifying the file.
        identity: String,
        /// Whether the run is a side-effect free preview.
        dry_run: bool,
    },
    /// A stage of a pipeline run changed status.
    StageProgress {
        /// Identifier of the run.
        run_id: Uuid,
        /// Stage name (`inspect`, `backup`, `sanitize`, `relocate`, `audit`).
        stage: String,
        /// New status of the stage.
        status: StageStatus,
        /// Optional human-readable detail.
        detail: Option<String>,
    },
    /// A pipeline run finished all stages.
    PipelineCompleted {
        /// Identifier of the run.
        run_id: Uuid,
        /// Final location of the sanitized file (absent for previews).
        final_path: Option<String>,
    },
    /// A pipeline run stopped on a failed stage.
    PipelineFailed {
        /// Identifier of the run.
        run_id: Uuid,
        /// Terminal state reached by the run.
        state: String,
        /// Failure description.
        message: String,
    },
    /// The watcher found a file whose size settled and submitted it.
    CandidateDetected {
        /// Canonical path identifying the file.
        identity: String,
        /// Size observed on the last two ticks.
        size: u64,
    },
    /// The watcher stopped retrying a file after repeated failures.
    FileAbandoned {
        /// Canonical path identifying the file.
        identity: String,
        /// Number of failed attempts.
        attempts: u32,
        /// Last failure reported by the pipeline.
        reason: String,
    },
    /// An audit record could not be written and was queued for retry.
    AuditQueued {
        /// Identifier of the run owning the record.
        run_id: Uuid,
        /// Queue depth after enqueueing.
        depth: usize,
    },
    /// An audit record was discarded.
    AuditDropped {
        /// Identifier of the run owning the record.
        run_id: Uuid,
        /// Reason for discarding the record.
        reason: String,
    },
    /// Component health changed.
    HealthChanged {
        /// Components currently reporting degraded health.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for the event type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PipelineStarted { .. } => "pipeline_started",
            Self::StageProgress { .. } => "stage_progress",
            Self::PipelineCompleted { .. } => "pipeline_completed",
            Self::PipelineFailed { .. } => "pipeline_failed",
            Self::CandidateDetected { .. } => "candidate_detected",
            Self::FileAbandoned { .. } => "file_abandoned",
            Self::AuditQueued { .. } => "audit_queued",
            Self::AuditDropped { .. } => "audit_dropped",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// Envelope carrying an event with its identifier and timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned by the bus.
    pub id: EventId,
    /// Time at which the event was published.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}
