mod common;

use std::sync::Arc;
use std::time::Duration;

use cleanslate_core::{
    AuditStatus, CollaboratorError, FailureKind, MetadataChange, ProcessOptions, RemoteTarget,
    RunState, Stage,
};
use cleanslate_events::{Event, StageStatus};
use cleanslate_pipeline::{DispatchRequest, PipelineError, RequestDispatcher};
use cleanslate_test_support::{
    FakeStripper, FakeTransfer, RecordingAuditLog, camera_metadata, write_file,
};
use common::Harness;
use serde_json::{Value, json};

fn full_run() -> ProcessOptions {
    ProcessOptions::default()
}

#[tokio::test]
async fn full_run_backs_up_strips_relocates_and_audits() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new()
            .with_metadata("photo.jpg", camera_metadata())
            .preserving("File:FileType"),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "photo.jpg", b"jpeg-bytes")?;

    let result = harness.pipeline.process(&source, full_run()).await?;

    assert!(result.success, "run failed: {:?}", result.failure);
    assert_eq!(result.state, RunState::Audited);
    assert!(!source.exists());
    let final_path = result.final_path.clone().expect("final path");
    assert_eq!(final_path, harness.output_dir.join("photo.jpg"));
    assert_eq!(std::fs::read(&final_path)?, b"jpeg-bytes");

    let uploads = harness.transfer.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].bytes, b"jpeg-bytes");
    assert_eq!(
        result.remote_ref.as_ref().map(ToString::to_string),
        Some("gdrive:backups/photo.jpg".to_string())
    );

    assert_eq!(result.removed_metadata.len(), 1);
    assert_eq!(
        result.removed_metadata.get("EXIF:Make"),
        Some(&MetadataChange {
            before: Value::from("Canon"),
            after: None,
        })
    );
    assert_eq!(
        result.audit,
        AuditStatus::Recorded {
            record_id: "rec-1".into()
        }
    );

    let records = harness.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, RunState::Relocated);
    assert_eq!(records[0].file_type, ".jpg");
    assert!(records[0].original_backed_up());
    assert_eq!(records[0].content_sha256.as_deref().map(str::len), Some(64));
    assert_eq!(
        serde_json::to_value(&records[0].removed_metadata)?,
        json!({"EXIF:Make": {"before": "Canon", "after": null}})
    );

    let stages: Vec<(Stage, StageStatus)> = result
        .stages
        .iter()
        .map(|record| (record.stage, record.status))
        .collect();
    assert_eq!(
        stages,
        vec![
            (Stage::Inspect, StageStatus::Completed),
            (Stage::Backup, StageStatus::Completed),
            (Stage::Sanitize, StageStatus::Completed),
            (Stage::Relocate, StageStatus::Completed),
            (Stage::Audit, StageStatus::Completed),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn dry_run_only_inspects() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new().with_metadata("photo.jpg", camera_metadata()),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "photo.jpg", b"original")?;

    let result = harness
        .pipeline
        .process(
            &source,
            ProcessOptions {
                dry_run: true,
                ..ProcessOptions::default()
            },
        )
        .await?;

    assert!(result.success);
    assert!(result.dry_run);
    assert!(result.confirmation_required);
    assert_eq!(result.state, RunState::Inspected);
    assert_eq!(result.metadata_before, camera_metadata());
    assert!(result.metadata_after.is_none());
    assert!(result.removed_metadata.is_empty());
    assert_eq!(result.audit, AuditStatus::NotAttempted);

    assert_eq!(std::fs::read(&source)?, b"original");
    assert_eq!(harness.stripper.inspect_calls(), 1);
    assert_eq!(harness.stripper.strip_calls(), 0);
    assert_eq!(harness.transfer.attempts(), 0);
    assert_eq!(harness.audit.attempts(), 0);
    assert!(!harness.output_dir.exists());
    Ok(())
}

#[tokio::test]
async fn confirmed_preview_needs_no_prompt() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let source = write_file(&harness.watch_dir, "doc.pdf", b"%PDF")?;
    let result = harness
        .pipeline
        .process(
            &source,
            ProcessOptions {
                dry_run: true,
                auto_confirm: true,
                remote_override: None,
            },
        )
        .await?;
    assert!(!result.confirmation_required);
    Ok(())
}

#[tokio::test]
async fn upload_recovers_after_two_transient_failures() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new().failing_with([
            CollaboratorError::transient("upload", "rclone exit 5"),
            CollaboratorError::transient("upload", "rclone exit 5"),
        ]),
        FakeStripper::new(),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "clip.mp4", b"frames")?;

    let result = harness.pipeline.process(&source, full_run()).await?;

    assert!(result.success);
    assert_eq!(harness.transfer.attempts(), 3);
    assert_eq!(harness.stripper.strip_calls(), 1);
    assert!(result.final_path.is_some());
    let backup = result
        .stages
        .iter()
        .find(|record| record.stage == Stage::Backup)
        .expect("backup stage");
    assert_eq!(backup.attempts, 3);
    Ok(())
}

#[tokio::test]
async fn failed_backup_never_strips() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new().failing_with([CollaboratorError::fatal(
            "upload",
            "remote not configured",
        )]),
        FakeStripper::new(),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "photo.png", b"png")?;

    let result = harness.pipeline.process(&source, full_run()).await?;

    assert!(!result.success);
    assert_eq!(result.state, RunState::BackupFailed);
    assert_eq!(harness.transfer.attempts(), 1);
    assert_eq!(harness.stripper.strip_calls(), 0);
    assert!(source.exists());
    let failure = result.failure.expect("failure detail");
    assert_eq!(failure.kind, FailureKind::Fatal);
    assert_eq!(failure.completed_stages, vec![Stage::Inspect]);
    assert!(!failure.is_partial());

    let records = harness.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, RunState::BackupFailed);
    assert!(records[0].failure.is_some());
    Ok(())
}

#[tokio::test]
async fn exhausted_transient_backup_marks_transfer_degraded() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new().failing_with(vec![
            CollaboratorError::transient("upload", "timeout");
            3
        ]),
        FakeStripper::new(),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "a.jpeg", b"x")?;

    let result = harness.pipeline.process(&source, full_run()).await?;

    assert_eq!(result.state, RunState::BackupFailed);
    assert_eq!(harness.transfer.attempts(), 3);
    assert_eq!(harness.stripper.strip_calls(), 0);
    assert_eq!(harness.pipeline.status().degraded, vec!["transfer".to_string()]);
    Ok(())
}

#[tokio::test]
async fn sanitize_failure_discloses_remote_copy() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new().failing_strip(CollaboratorError::fatal(
            "strip",
            "Metadata stripping failed (exit code 1): corrupt file",
        )),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "scan.pdf", b"%PDF-1.7")?;
    let dispatcher = RequestDispatcher::new(Arc::clone(&harness.pipeline));

    let result = dispatcher
        .sanitize(&source, DispatchRequest::default())
        .await?;

    assert!(!result.success);
    assert_eq!(result.state, RunState::SanitizeFailed);
    let failure = result.failure.as_ref().expect("failure detail");
    assert!(failure.is_partial());
    assert_eq!(failure.completed_stages, vec![Stage::Inspect, Stage::Backup]);
    assert_eq!(
        failure.remote_ref.as_ref().map(ToString::to_string),
        Some("gdrive:backups/scan.pdf".to_string())
    );
    assert_eq!(
        result.share_link.as_deref(),
        Some("https://share.example/gdrive/backups/scan.pdf")
    );
    assert!(source.exists());
    Ok(())
}

#[tokio::test]
async fn concurrent_calls_for_same_file_run_once() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new()
            .with_metadata("photo.jpg", camera_metadata())
            .with_delay(Duration::from_millis(100)),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "photo.jpg", b"bytes")?;

    let (first, second) = tokio::join!(
        harness.pipeline.process(&source, full_run()),
        harness.pipeline.process(&source, full_run()),
    );
    let (first, second) = (first?, second?);

    assert_eq!(harness.transfer.attempts(), 1);
    assert_eq!(harness.stripper.strip_calls(), 1);
    assert_eq!(harness.audit.records().len(), 1);
    assert_eq!(first.run_id, second.run_id);
    assert!(first.deduplicated ^ second.deduplicated);
    assert!(first.success && second.success);
    assert_eq!(harness.pipeline.status().in_flight, 0);
    Ok(())
}

#[tokio::test]
async fn audit_outage_does_not_fail_the_run() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new(),
        RecordingAuditLog::new().failing_with([CollaboratorError::transient(
            "audit",
            "firestore unavailable",
        )]),
    )?;
    let source = write_file(&harness.watch_dir, "notes.docx", b"PK")?;

    let result = harness.pipeline.process(&source, full_run()).await?;

    assert!(result.success);
    assert_eq!(result.state, RunState::Relocated);
    assert_eq!(result.audit, AuditStatus::Queued);
    assert!(result.final_path.is_some());
    let status = harness.pipeline.status();
    assert_eq!(status.audit_queue_depth, 1);
    assert_eq!(status.degraded, vec!["audit".to_string()]);

    let report = harness.pipeline.audit_queue().drain().await;
    assert_eq!(report.written, 1);
    assert!(harness.pipeline.status().degraded.is_empty());
    Ok(())
}

#[tokio::test]
async fn shutdown_aborts_between_stages() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let source = write_file(&harness.watch_dir, "late.jpg", b"x")?;
    harness.trigger.trigger();

    let result = harness.pipeline.process(&source, full_run()).await?;

    assert!(!result.success);
    assert_eq!(result.state, RunState::Inspected);
    let failure = result.failure.expect("failure detail");
    assert_eq!(failure.kind, FailureKind::Aborted);
    assert_eq!(failure.stage, Stage::Backup);
    assert_eq!(harness.transfer.attempts(), 0);
    assert!(source.exists());
    Ok(())
}

#[tokio::test]
async fn shutdown_after_backup_stops_before_stripping() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new().with_delay(Duration::from_millis(200)),
        FakeStripper::new(),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "late.jpg", b"original")?;

    let (result, ()) = tokio::join!(harness.pipeline.process(&source, full_run()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        harness.trigger.trigger();
    });
    let result = result?;

    assert!(!result.success);
    assert_eq!(result.state, RunState::BackedUp);
    assert_eq!(
        result.remote_ref.as_ref().map(ToString::to_string),
        Some("gdrive:backups/late.jpg".to_string())
    );
    let failure = result.failure.expect("failure detail");
    assert_eq!(failure.kind, FailureKind::Aborted);
    assert_eq!(failure.stage, Stage::Sanitize);
    assert!(failure.remote_ref.is_some());
    assert_eq!(harness.stripper.strip_calls(), 0);
    assert_eq!(std::fs::read(&source)?, b"original");
    Ok(())
}

#[tokio::test]
async fn relocate_failure_discloses_remote_copy() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    std::fs::write(&harness.output_dir, b"not a directory")?;
    let source = write_file(&harness.watch_dir, "photo.jpg", b"original")?;
    let dispatcher = RequestDispatcher::new(Arc::clone(&harness.pipeline));

    let result = dispatcher
        .sanitize(&source, DispatchRequest::default())
        .await?;

    assert!(!result.success);
    assert_eq!(result.state, RunState::RelocateFailed);
    let failure = result.failure.as_ref().expect("failure detail");
    assert_eq!(failure.stage, Stage::Relocate);
    assert_eq!(failure.kind, FailureKind::Local);
    assert!(failure.is_partial());
    assert_eq!(
        failure.completed_stages,
        vec![Stage::Inspect, Stage::Backup, Stage::Sanitize]
    );
    assert_eq!(
        failure.remote_ref.as_ref().map(ToString::to_string),
        Some("gdrive:backups/photo.jpg".to_string())
    );
    assert_eq!(
        result.share_link.as_deref(),
        Some("https://share.example/gdrive/backups/photo.jpg")
    );
    assert!(source.exists());
    let records = harness.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, RunState::RelocateFailed);
    Ok(())
}

#[tokio::test]
async fn retry_after_relocate_failure_keeps_remote_original() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new()
            .with_metadata("photo.jpg", camera_metadata())
            .rewriting(b"SANITIZED"),
        RecordingAuditLog::new(),
    )?;
    std::fs::write(&harness.output_dir, b"not a directory")?;
    let source = write_file(&harness.watch_dir, "photo.jpg", b"ORIGINAL")?;

    let first = harness.pipeline.process(&source, full_run()).await?;
    assert_eq!(first.state, RunState::RelocateFailed);
    assert_eq!(std::fs::read(&source)?, b"SANITIZED");

    std::fs::remove_file(&harness.output_dir)?;
    let second = harness.pipeline.process(&source, full_run()).await?;

    assert!(second.success, "retry failed: {:?}", second.failure);
    assert_eq!(second.state, RunState::Audited);
    let uploads = harness.transfer.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].bytes, b"ORIGINAL");
    assert_eq!(harness.stripper.strip_calls(), 1);
    assert_eq!(second.remote_ref, first.remote_ref);
    assert_eq!(second.metadata_before, camera_metadata());
    assert!(second.removed_metadata.contains_key("EXIF:Make"));

    let reused: Vec<(Stage, StageStatus)> = second
        .stages
        .iter()
        .filter(|record| matches!(record.stage, Stage::Backup | Stage::Sanitize))
        .map(|record| (record.stage, record.status))
        .collect();
    assert_eq!(
        reused,
        vec![
            (Stage::Backup, StageStatus::Skipped),
            (Stage::Sanitize, StageStatus::Skipped),
        ]
    );

    let final_path = second.final_path.expect("final path");
    assert_eq!(std::fs::read(&final_path)?, b"SANITIZED");
    assert_eq!(std::fs::read_dir(&harness.watch_dir)?.count(), 0);

    let records = harness.audit.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].content_sha256, records[1].content_sha256);
    Ok(())
}

#[tokio::test]
async fn edited_file_after_failed_relocate_is_backed_up_again() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new().rewriting(b"SANITIZED"),
        RecordingAuditLog::new(),
    )?;
    std::fs::write(&harness.output_dir, b"not a directory")?;
    let source = write_file(&harness.watch_dir, "photo.jpg", b"ORIGINAL")?;

    let first = harness.pipeline.process(&source, full_run()).await?;
    assert_eq!(first.state, RunState::RelocateFailed);

    std::fs::write(&source, b"NEW VERSION")?;
    std::fs::remove_file(&harness.output_dir)?;
    let second = harness.pipeline.process(&source, full_run()).await?;

    assert!(second.success);
    let uploads = harness.transfer.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[1].bytes, b"NEW VERSION");
    assert_eq!(harness.stripper.strip_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn inspect_failure_leaves_file_untouched() -> anyhow::Result<()> {
    let harness = Harness::with(
        FakeTransfer::new(),
        FakeStripper::new().failing_inspect(CollaboratorError::fatal(
            "inspect",
            "exiftool not found in PATH",
        )),
        RecordingAuditLog::new(),
    )?;
    let source = write_file(&harness.watch_dir, "a.mov", b"moov")?;

    let result = harness
        .pipeline
        .process(
            &source,
            ProcessOptions {
                dry_run: true,
                ..ProcessOptions::default()
            },
        )
        .await?;

    assert_eq!(result.state, RunState::InspectFailed);
    assert!(!result.confirmation_required);
    assert_eq!(harness.audit.attempts(), 0);
    assert!(source.exists());
    Ok(())
}

#[tokio::test]
async fn rejects_unsupported_and_missing_files() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let text = write_file(&harness.watch_dir, "notes.txt", b"hi")?;

    let unsupported = harness.pipeline.process(&text, full_run()).await;
    assert!(matches!(
        unsupported,
        Err(PipelineError::UnsupportedFileType { extension: Some(ref ext), .. }) if ext == ".txt"
    ));

    let missing = harness
        .pipeline
        .process(&harness.watch_dir.join("gone.jpg"), full_run())
        .await;
    assert!(matches!(missing, Err(PipelineError::FileNotFound { .. })));
    assert_eq!(harness.stripper.inspect_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn remote_override_and_standalone_backup() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let dispatcher = RequestDispatcher::new(Arc::clone(&harness.pipeline));
    let source = write_file(&harness.watch_dir, "archive.bin", b"blob")?;
    let target: RemoteTarget = "s3:vault/2024".parse()?;

    let receipt = dispatcher.backup(&source, Some(target.clone())).await?;

    assert_eq!(receipt.remote_ref.to_string(), "s3:vault/2024/archive.bin");
    assert_eq!(receipt.attempts, 1);
    assert!(receipt.share_link.is_some());
    assert!(source.exists());
    assert_eq!(harness.transfer.uploads()[0].target, target);

    let missing = dispatcher
        .backup(&harness.watch_dir.join("nope.jpg"), None)
        .await;
    assert!(matches!(missing, Err(PipelineError::FileNotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn run_publishes_lifecycle_events() -> anyhow::Result<()> {
    let harness = Harness::new()?;
    let source = write_file(&harness.watch_dir, "e.jpg", b"x")?;

    let result = harness.pipeline.process(&source, full_run()).await?;

    let kinds: Vec<&'static str> = harness
        .events
        .recent(64)
        .iter()
        .map(|envelope| envelope.event.kind())
        .collect();
    assert_eq!(kinds.first(), Some(&"pipeline_started"));
    assert_eq!(kinds.last(), Some(&"pipeline_completed"));
    assert!(harness.events.recent(64).iter().any(|envelope| matches!(
        &envelope.event,
        Event::PipelineCompleted { run_id, .. } if *run_id == result.run_id
    )));
    assert!(harness.metrics.render()?.contains("pipeline_runs_total"));
    Ok(())
}
