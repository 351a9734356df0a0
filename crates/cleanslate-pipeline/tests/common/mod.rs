#![allow(dead_code, unreachable_pub)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cleanslate_core::RemoteTarget;
use cleanslate_events::EventBus;
use cleanslate_pipeline::{
    PipelineDeps, PipelineSettings, ProcessingPipeline, RetryPolicy, Shutdown, ShutdownTrigger,
};
use cleanslate_telemetry::Metrics;
use cleanslate_test_support::{FakeStripper, FakeTransfer, RecordingAuditLog};
use tempfile::TempDir;

pub struct Harness {
    pub root: TempDir,
    pub watch_dir: PathBuf,
    pub output_dir: PathBuf,
    pub transfer: Arc<FakeTransfer>,
    pub stripper: Arc<FakeStripper>,
    pub audit: Arc<RecordingAuditLog>,
    pub events: EventBus,
    pub metrics: Metrics,
    pub trigger: ShutdownTrigger,
    pub pipeline: Arc<ProcessingPipeline>,
}

impl Harness {
    pub fn new() -> anyhow::Result<Self> {
        Self::with(FakeTransfer::new(), FakeStripper::new(), RecordingAuditLog::new())
    }

    pub fn with(
        transfer: FakeTransfer,
        stripper: FakeStripper,
        audit: RecordingAuditLog,
    ) -> anyhow::Result<Self> {
        let root = tempfile::tempdir()?;
        let watch_dir = root.path().join("watch");
        let output_dir = root.path().join("clean");
        std::fs::create_dir_all(&watch_dir)?;

        let transfer = Arc::new(transfer);
        let stripper = Arc::new(stripper);
        let audit = Arc::new(audit);
        let events = EventBus::with_capacity(256);
        let metrics = Metrics::new()?;
        let (trigger, shutdown) = Shutdown::channel();
        let settings = PipelineSettings {
            output_dir: output_dir.clone(),
            default_target: RemoteTarget::new("gdrive", "backups"),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
            collaborator_timeout: Duration::from_secs(5),
            audit_queue_capacity: 8,
        };
        let pipeline = Arc::new(ProcessingPipeline::new(
            PipelineDeps {
                transfer: transfer.clone(),
                stripper: stripper.clone(),
                audit: audit.clone(),
            },
            settings,
            events.clone(),
            metrics.clone(),
            shutdown,
        ));
        Ok(Self {
            root,
            watch_dir,
            output_dir,
            transfer,
            stripper,
            audit,
            events,
            metrics,
            trigger,
            pipeline,
        })
    }
}
