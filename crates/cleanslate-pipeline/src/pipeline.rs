//! Stage orchestration for a single file.
//!
//! # Design
//! - Stages run strictly in order: inspect, backup, sanitize, relocate, audit.
//!   A stage starts only after the previous one completed, so the original is
//!   never modified before a remote copy exists.
//! - Each stage is recorded as a [`StageRecord`], published as
//!   [`Event::StageProgress`] and counted in `pipeline_stages_total`.
//! - Previews stop after inspect and touch nothing else.
//! - A source stripped by an earlier run that failed to relocate resumes at
//!   relocate; its stripped bytes are never uploaded as the backup.
//! - Shutdown is honoured between stages; an interrupted run reports the last
//!   state it actually reached.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cleanslate_config::AppConfig;
use cleanslate_core::{
    AuditLog, AuditStatus, CollaboratorError, FailureKind, FileIdentity, MetadataMap,
    MetadataStripper, PipelineFailure, ProcessOptions, ProcessingResult, RecordKind, RemoteRef,
    RemoteTarget, RemovedMetadata, RunState, Stage, StageRecord, TransactionRecord, TransferClient,
    ensure_supported, extension_of, removed_metadata,
};
use cleanslate_events::{Event, EventBus, StageStatus};
use cleanslate_telemetry::Metrics;
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::audit::AuditQueue;
use crate::error::{PipelineError, PipelineResult};
use crate::health::{COMPONENT_TRANSFER, HealthRegistry};
use crate::lock::{Admission, IdentityLocks};
use crate::marker::{SanitizedMarker, remove_marker, resume_marker, write_marker};
use crate::relocate::{content_sha256, relocate};
use crate::retry::{Attempted, RetryPolicy, with_backoff, with_timeout};
use crate::shutdown::Shutdown;

/// External collaborators the pipeline drives.
pub struct PipelineDeps {
    /// Remote storage client.
    pub transfer: Arc<dyn TransferClient>,
    /// Metadata reader/stripper.
    pub stripper: Arc<dyn MetadataStripper>,
    /// Audit sink.
    pub audit: Arc<dyn AuditLog>,
}

/// Tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory receiving sanitized files.
    pub output_dir: PathBuf,
    /// Backup destination when the caller does not override it.
    pub default_target: RemoteTarget,
    /// Retry schedule for uploads.
    pub retry: RetryPolicy,
    /// Timeout applied to every collaborator call.
    pub collaborator_timeout: Duration,
    /// Bound of the audit retry queue.
    pub audit_queue_capacity: usize,
}

impl PipelineSettings {
    /// Derive settings from the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            output_dir: config.watch.output_dir.clone(),
            default_target: RemoteTarget::new(
                config.transfer.remote_name.clone(),
                &config.transfer.dest_path,
            ),
            retry: RetryPolicy::from(&config.retry),
            collaborator_timeout: config.collaborator_timeout,
            audit_queue_capacity: config.audit.queue_capacity,
        }
    }
}

/// Point-in-time view reported by `/status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineStatus {
    /// Identities with a run in flight or waiting.
    pub in_flight: usize,
    /// Audit records waiting for redelivery.
    pub audit_queue_depth: usize,
    /// Components currently degraded.
    pub degraded: Vec<String>,
}

/// Shared pipeline used by the watcher, the HTTP API and the CLI.
pub struct ProcessingPipeline {
    transfer: Arc<dyn TransferClient>,
    stripper: Arc<dyn MetadataStripper>,
    audit: Arc<AuditQueue>,
    health: Arc<HealthRegistry>,
    locks: Arc<IdentityLocks>,
    settings: PipelineSettings,
    events: EventBus,
    metrics: Metrics,
    shutdown: Shutdown,
}

impl ProcessingPipeline {
    /// Assemble a pipeline around its collaborators.
    #[must_use]
    pub fn new(
        deps: PipelineDeps,
        settings: PipelineSettings,
        events: EventBus,
        metrics: Metrics,
        shutdown: Shutdown,
    ) -> Self {
        let health = Arc::new(HealthRegistry::new(events.clone()));
        let audit = Arc::new(AuditQueue::new(
            deps.audit,
            settings.audit_queue_capacity,
            settings.collaborator_timeout,
            events.clone(),
            metrics.clone(),
            Arc::clone(&health),
        ));
        Self {
            transfer: deps.transfer,
            stripper: deps.stripper,
            audit,
            health,
            locks: Arc::new(IdentityLocks::default()),
            settings,
            events,
            metrics,
            shutdown,
        }
    }

    /// Audit queue, for spawning the drainer.
    #[must_use]
    pub fn audit_queue(&self) -> Arc<AuditQueue> {
        Arc::clone(&self.audit)
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Event bus the pipeline publishes on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Metrics registry the pipeline records into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Current in-flight, queue and health view.
    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            in_flight: self.locks.active(),
            audit_queue_depth: self.audit.depth(),
            degraded: self.health.degraded(),
        }
    }

    /// Drive `path` through the pipeline.
    ///
    /// A caller that arrives while a run for the same identity is in flight
    /// waits for it and receives its result with `deduplicated` set.
    ///
    /// # Errors
    ///
    /// Returns an error only for input rejected before any side effect: an
    /// unsupported extension, a missing path or a path that is not a file.
    /// Stage failures are reported inside the [`ProcessingResult`].
    pub async fn process(
        &self,
        path: &Path,
        options: ProcessOptions,
    ) -> PipelineResult<ProcessingResult> {
        ensure_supported(path)?;
        let stat = tokio::fs::metadata(path)
            .await
            .map_err(|err| PipelineError::from_stat(path, err))?;
        if !stat.is_file() {
            return Err(PipelineError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let identity = FileIdentity::resolve(path)
            .map_err(|err| PipelineError::io("resolve_identity", path, err))?;

        match self.locks.admit(&identity, options.dry_run).await {
            Admission::Adopted(mut result) => {
                info!(identity = %identity, run_id = %result.run_id, "adopted result of concurrent run");
                result.deduplicated = true;
                Ok(result)
            }
            Admission::Run(permit) => {
                let run_id = Uuid::new_v4();
                let span = info_span!(
                    "pipeline.run",
                    run_id = %run_id,
                    identity = %identity,
                    dry_run = options.dry_run
                );
                let result = self
                    .run(run_id, identity, path, stat.len(), &options)
                    .instrument(span)
                    .await;
                permit.complete(result.clone());
                Ok(result)
            }
        }
    }

    /// Submit an audit record for a file the watcher gave up on.
    pub async fn record_abandonment(
        &self,
        identity: &FileIdentity,
        attempts: u32,
        reason: &str,
    ) -> AuditStatus {
        let now = Utc::now();
        let path = identity.as_path();
        let record = TransactionRecord {
            run_id: Uuid::new_v4(),
            kind: RecordKind::Abandoned,
            identity: identity.clone(),
            file_name: file_name_of(path),
            file_type: extension_of(path).unwrap_or_default(),
            content_sha256: None,
            started_at: now,
            finished_at: now,
            state: RunState::Abandoned,
            stages: Vec::new(),
            metadata_before: MetadataMap::new(),
            metadata_after: None,
            removed_metadata: RemovedMetadata::new(),
            remote_ref: None,
            final_path: None,
            failure: Some(reason.to_string()),
            attempts: Some(attempts),
        };
        self.metrics.inc_pipeline_run("abandoned");
        self.audit.submit(record).await
    }

    /// Upload `path` with the configured retry schedule and timeout.
    pub(crate) async fn upload_with_retry(
        &self,
        path: &Path,
        target: &RemoteTarget,
    ) -> Attempted<RemoteRef> {
        let limit = self.settings.collaborator_timeout;
        let outcome = with_backoff(
            &self.settings.retry,
            "upload",
            &self.shutdown,
            &self.metrics,
            || with_timeout("upload", limit, self.transfer.upload(path, target)),
        )
        .await;
        match &outcome {
            Ok(_) => self.health.mark_recovered(COMPONENT_TRANSFER),
            Err((err, _)) if err.is_transient() => {
                self.health.mark_degraded(COMPONENT_TRANSFER, err.detail());
            }
            Err(_) => {}
        }
        outcome
    }

    /// Derive a shareable link; failures are logged and yield `None`.
    pub(crate) async fn share_link(&self, remote: &RemoteRef) -> Option<String> {
        let limit = self.settings.collaborator_timeout;
        match with_timeout("share_link", limit, self.transfer.share_link(remote)).await {
            Ok(link) => Some(link),
            Err(err) => {
                warn!(remote = %remote, detail = err.detail(), "failed to derive share link");
                None
            }
        }
    }

    async fn run(
        &self,
        run_id: Uuid,
        identity: FileIdentity,
        path: &Path,
        file_size: u64,
        options: &ProcessOptions,
    ) -> ProcessingResult {
        self.metrics.add_pipeline_in_flight(1);
        let _ = self.events.publish(Event::PipelineStarted {
            run_id,
            identity: identity.to_string(),
            dry_run: options.dry_run,
        });
        info!(size = file_size, "pipeline run started");

        let mut draft = RunDraft::new(run_id, identity, path, file_size);
        let mut tracker = RunTracker::new(run_id, &self.events, &self.metrics);
        let failure = self.run_stages(&mut draft, &mut tracker, options).await;
        let result = self.finish(draft, tracker, failure, options).await;

        self.metrics.add_pipeline_in_flight(-1);
        result
    }

    async fn run_stages(
        &self,
        draft: &mut RunDraft,
        tracker: &mut RunTracker<'_>,
        options: &ProcessOptions,
    ) -> Option<PipelineFailure> {
        let limit = self.settings.collaborator_timeout;

        tracker.start(Stage::Inspect);
        match with_timeout("inspect", limit, self.stripper.inspect(&draft.source_path)).await {
            Ok(metadata) => {
                tracker.complete(Stage::Inspect, 1, Some(format!("{} fields", metadata.len())));
                draft.metadata_before = metadata;
            }
            Err(err) => {
                tracker.fail(Stage::Inspect, 1, err.detail());
                return Some(tracker.failure(
                    Stage::Inspect,
                    failure_kind(&err),
                    format!("Metadata read failed: {}", err.detail()),
                    None,
                ));
            }
        }

        if options.dry_run {
            for stage in [Stage::Backup, Stage::Sanitize, Stage::Relocate, Stage::Audit] {
                tracker.skip(stage, "dry run");
            }
            return None;
        }

        draft.content_sha256 = self.digest(&draft.source_path).await;
        let resumed = match draft.content_sha256.as_deref() {
            Some(digest) => resume_marker(&draft.source_path, digest).await,
            None => None,
        };
        if let Some(marker) = resumed {
            Self::resume_stripped(draft, tracker, marker);
        } else if let Some(failure) = self.backup_and_strip(draft, tracker, options).await {
            return Some(failure);
        }

        if let Some(aborted) = self.abort_before(tracker, Stage::Relocate, draft.remote_ref.clone())
        {
            return Some(aborted);
        }
        tracker.start(Stage::Relocate);
        let source = draft.source_path.clone();
        let output_dir = self.settings.output_dir.clone();
        let run_id = draft.run_id;
        let moved = tokio::task::spawn_blocking(move || relocate(&source, &output_dir, run_id))
            .await
            .map_err(|err| err.to_string())
            .and_then(|moved| moved.map_err(|err| error_chain(&err)));
        match moved {
            Ok(destination) => {
                tracker.complete(
                    Stage::Relocate,
                    1,
                    Some(destination.display().to_string()),
                );
                draft.final_path = Some(destination);
                remove_marker(&draft.source_path).await;
            }
            Err(message) => {
                tracker.fail(Stage::Relocate, 1, &message);
                return Some(tracker.failure(
                    Stage::Relocate,
                    FailureKind::Local,
                    format!("Relocation failed: {message}"),
                    draft.remote_ref.clone(),
                ));
            }
        }
        None
    }

    /// Backup then strip in place; `None` when both stages completed.
    async fn backup_and_strip(
        &self,
        draft: &mut RunDraft,
        tracker: &mut RunTracker<'_>,
        options: &ProcessOptions,
    ) -> Option<PipelineFailure> {
        let limit = self.settings.collaborator_timeout;

        if let Some(aborted) = self.abort_before(tracker, Stage::Backup, None) {
            return Some(aborted);
        }
        tracker.start(Stage::Backup);
        let target = options
            .remote_override
            .clone()
            .unwrap_or_else(|| self.settings.default_target.clone());
        match self.upload_with_retry(&draft.source_path, &target).await {
            Ok((remote, attempts)) => {
                tracker.complete(Stage::Backup, attempts, Some(remote.to_string()));
                draft.remote_ref = Some(remote);
            }
            Err((err, attempts)) => {
                tracker.fail(Stage::Backup, attempts, err.detail());
                return Some(tracker.failure(
                    Stage::Backup,
                    failure_kind(&err),
                    format!("Backup failed after {attempts} attempt(s): {}", err.detail()),
                    None,
                ));
            }
        }

        if let Some(aborted) = self.abort_before(tracker, Stage::Sanitize, draft.remote_ref.clone())
        {
            return Some(aborted);
        }
        tracker.start(Stage::Sanitize);
        match with_timeout("strip", limit, self.stripper.strip(&draft.source_path)).await {
            Ok(outcome) => {
                let removed = outcome.removed().len();
                tracker.complete(Stage::Sanitize, 1, Some(format!("{removed} fields removed")));
                draft.metadata_before = outcome.before;
                draft.metadata_after = Some(outcome.after);
            }
            Err(err) => {
                tracker.fail(Stage::Sanitize, 1, err.detail());
                return Some(tracker.failure(
                    Stage::Sanitize,
                    failure_kind(&err),
                    format!("Metadata stripping failed: {}", err.detail()),
                    draft.remote_ref.clone(),
                ));
            }
        }
        self.mark_stripped(draft).await;
        None
    }

    /// Adopt the backup and strip of an earlier run on the same bytes.
    fn resume_stripped(draft: &mut RunDraft, tracker: &mut RunTracker<'_>, marker: SanitizedMarker) {
        info!(remote = %marker.remote_ref, "source already stripped; resuming at relocate");
        tracker.reuse(Stage::Backup, format!("original already at {}", marker.remote_ref));
        tracker.reuse(Stage::Sanitize, "already stripped".to_string());
        if marker.original_sha256.is_some() {
            draft.content_sha256 = marker.original_sha256;
        }
        draft.metadata_before = marker.metadata_before;
        draft.metadata_after = Some(marker.metadata_after);
        draft.remote_ref = Some(marker.remote_ref);
    }

    /// Record that the source now holds stripped bytes backed up remotely.
    async fn mark_stripped(&self, draft: &RunDraft) {
        let (Some(remote_ref), Some(metadata_after)) =
            (draft.remote_ref.clone(), draft.metadata_after.clone())
        else {
            return;
        };
        let Some(sanitized_sha256) = self.digest(&draft.source_path).await else {
            return;
        };
        let marker = SanitizedMarker {
            original_sha256: draft.content_sha256.clone(),
            sanitized_sha256,
            remote_ref,
            metadata_before: draft.metadata_before.clone(),
            metadata_after,
        };
        if let Err(err) = write_marker(&draft.source_path, &marker).await {
            warn!(path = %draft.source_path.display(), error = %err, "failed to write sanitized marker");
        }
    }

    async fn finish(
        &self,
        draft: RunDraft,
        mut tracker: RunTracker<'_>,
        failure: Option<PipelineFailure>,
        options: &ProcessOptions,
    ) -> ProcessingResult {
        let mut state = match &failure {
            Some(failure) if failure.kind != FailureKind::Aborted => {
                RunState::failed_at(failure.stage)
            }
            _ => tracker.last_state(),
        };

        let mut audit = AuditStatus::NotAttempted;
        if !options.dry_run {
            let record = draft.record(
                state,
                tracker.stages.clone(),
                failure.as_ref().map(|failure| failure.message.clone()),
            );
            tracker.start(Stage::Audit);
            audit = self.audit.submit(record).await;
            match &audit {
                AuditStatus::Recorded { record_id } => {
                    tracker.complete(Stage::Audit, 1, Some(record_id.clone()));
                }
                AuditStatus::Queued => tracker.fail(Stage::Audit, 1, "queued for retry"),
                AuditStatus::Failed { reason } => tracker.fail(Stage::Audit, 1, reason),
                AuditStatus::NotAttempted => {}
            }
            if failure.is_none() && matches!(audit, AuditStatus::Recorded { .. }) {
                state = RunState::Audited;
            }
        }

        let success = failure.is_none();
        let outcome = match &failure {
            None if options.dry_run => "preview",
            None => "success",
            Some(failure) if failure.kind == FailureKind::Aborted => "aborted",
            Some(failure) if failure.is_partial() => "partial",
            Some(_) => "failed",
        };
        self.metrics.inc_pipeline_run(outcome);

        match &failure {
            None => {
                info!(state = state.as_str(), outcome, "pipeline run finished");
                let _ = self.events.publish(Event::PipelineCompleted {
                    run_id: draft.run_id,
                    final_path: draft
                        .final_path
                        .as_ref()
                        .map(|path| path.display().to_string()),
                });
            }
            Some(failure) => {
                warn!(
                    state = state.as_str(),
                    stage = failure.stage.as_str(),
                    backed_up = failure.remote_ref.is_some(),
                    message = %failure.message,
                    "pipeline run failed"
                );
                let _ = self.events.publish(Event::PipelineFailed {
                    run_id: draft.run_id,
                    state: state.as_str().to_string(),
                    message: failure.message.clone(),
                });
            }
        }

        let removed = draft
            .metadata_after
            .as_ref()
            .map(|after| removed_metadata(&draft.metadata_before, after))
            .unwrap_or_default();
        ProcessingResult {
            run_id: draft.run_id,
            identity: draft.identity,
            success,
            state,
            dry_run: options.dry_run,
            confirmation_required: options.dry_run && success && !options.auto_confirm,
            deduplicated: false,
            source_path: draft.source_path,
            final_path: draft.final_path,
            file_size: draft.file_size,
            metadata_before: draft.metadata_before,
            metadata_after: draft.metadata_after,
            removed_metadata: removed,
            remote_ref: draft.remote_ref,
            share_link: None,
            failure,
            audit,
            stages: tracker.stages,
        }
    }

    fn abort_before(
        &self,
        tracker: &RunTracker<'_>,
        next: Stage,
        remote_ref: Option<RemoteRef>,
    ) -> Option<PipelineFailure> {
        if !self.shutdown.is_triggered() {
            return None;
        }
        warn!(next = next.as_str(), "shutdown requested; stopping between stages");
        Some(tracker.failure(
            next,
            FailureKind::Aborted,
            format!("Aborted by shutdown before {}", next.as_str()),
            remote_ref,
        ))
    }

    async fn digest(&self, path: &Path) -> Option<String> {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || content_sha256(&owned)).await {
            Ok(Ok(digest)) => Some(digest),
            Ok(Err(err)) => {
                warn!(path = %path.display(), error = %err, "failed to hash file");
                None
            }
            Err(err) => {
                warn!(error = %err, "hash task failed");
                None
            }
        }
    }
}

/// Values accumulated while a run advances.
struct RunDraft {
    run_id: Uuid,
    identity: FileIdentity,
    source_path: PathBuf,
    file_size: u64,
    started_at: DateTime<Utc>,
    content_sha256: Option<String>,
    metadata_before: MetadataMap,
    metadata_after: Option<MetadataMap>,
    remote_ref: Option<RemoteRef>,
    final_path: Option<PathBuf>,
}

impl RunDraft {
    fn new(run_id: Uuid, identity: FileIdentity, path: &Path, file_size: u64) -> Self {
        Self {
            run_id,
            identity,
            source_path: path.to_path_buf(),
            file_size,
            started_at: Utc::now(),
            content_sha256: None,
            metadata_before: MetadataMap::new(),
            metadata_after: None,
            remote_ref: None,
            final_path: None,
        }
    }

    fn record(
        &self,
        state: RunState,
        stages: Vec<StageRecord>,
        failure: Option<String>,
    ) -> TransactionRecord {
        let removed = self
            .metadata_after
            .as_ref()
            .map(|after| removed_metadata(&self.metadata_before, after))
            .unwrap_or_default();
        TransactionRecord {
            run_id: self.run_id,
            kind: RecordKind::Run,
            identity: self.identity.clone(),
            file_name: file_name_of(&self.source_path),
            file_type: extension_of(&self.source_path).unwrap_or_default(),
            content_sha256: self.content_sha256.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            state,
            stages,
            metadata_before: self.metadata_before.clone(),
            metadata_after: self.metadata_after.clone(),
            removed_metadata: removed,
            remote_ref: self.remote_ref.clone(),
            final_path: self.final_path.clone(),
            failure,
            attempts: None,
        }
    }
}

/// Stage timeline with event and metric emission.
struct RunTracker<'a> {
    run_id: Uuid,
    events: &'a EventBus,
    metrics: &'a Metrics,
    stages: Vec<StageRecord>,
    completed: Vec<Stage>,
}

impl<'a> RunTracker<'a> {
    const fn new(run_id: Uuid, events: &'a EventBus, metrics: &'a Metrics) -> Self {
        Self {
            run_id,
            events,
            metrics,
            stages: Vec::new(),
            completed: Vec::new(),
        }
    }

    fn start(&mut self, stage: Stage) {
        self.stages.push(StageRecord {
            stage,
            status: StageStatus::Started,
            detail: None,
            attempts: 0,
            started_at: Utc::now(),
            finished_at: None,
        });
        self.emit(stage, StageStatus::Started, None);
    }

    fn complete(&mut self, stage: Stage, attempts: u32, detail: Option<String>) {
        self.settle(stage, StageStatus::Completed, attempts, detail);
        self.completed.push(stage);
    }

    fn fail(&mut self, stage: Stage, attempts: u32, detail: &str) {
        self.settle(stage, StageStatus::Failed, attempts, Some(detail.to_string()));
    }

    /// Count `stage` as done by an earlier run.
    fn reuse(&mut self, stage: Stage, detail: String) {
        self.skip(stage, &detail);
        self.completed.push(stage);
    }

    fn skip(&mut self, stage: Stage, detail: &str) {
        let now = Utc::now();
        self.stages.push(StageRecord {
            stage,
            status: StageStatus::Skipped,
            detail: Some(detail.to_string()),
            attempts: 0,
            started_at: now,
            finished_at: Some(now),
        });
        self.emit(stage, StageStatus::Skipped, Some(detail.to_string()));
    }

    fn settle(&mut self, stage: Stage, status: StageStatus, attempts: u32, detail: Option<String>) {
        if let Some(record) = self
            .stages
            .iter_mut()
            .rev()
            .find(|record| record.stage == stage)
        {
            record.status = status;
            record.attempts = attempts;
            record.detail.clone_from(&detail);
            record.finished_at = Some(Utc::now());
        }
        self.emit(stage, status, detail);
    }

    fn emit(&self, stage: Stage, status: StageStatus, detail: Option<String>) {
        match status {
            StageStatus::Failed => {
                warn!(stage = stage.as_str(), detail = detail.as_deref(), "stage failed");
            }
            _ => debug!(
                stage = stage.as_str(),
                status = status.as_str(),
                detail = detail.as_deref(),
                "stage progress"
            ),
        }
        self.metrics
            .inc_pipeline_stage(stage.as_str(), status.as_str());
        let _ = self.events.publish(Event::StageProgress {
            run_id: self.run_id,
            stage: stage.as_str().to_string(),
            status,
            detail,
        });
    }

    fn last_state(&self) -> RunState {
        self.completed
            .last()
            .map_or(RunState::InspectFailed, |stage| RunState::completed(*stage))
    }

    fn failure(
        &self,
        stage: Stage,
        kind: FailureKind,
        message: String,
        remote_ref: Option<RemoteRef>,
    ) -> PipelineFailure {
        PipelineFailure {
            stage,
            kind,
            message,
            completed_stages: self.completed.clone(),
            remote_ref,
        }
    }
}

const fn failure_kind(err: &CollaboratorError) -> FailureKind {
    if err.is_transient() {
        FailureKind::Transient
    } else {
        FailureKind::Fatal
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
