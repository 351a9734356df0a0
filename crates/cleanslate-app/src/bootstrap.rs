//! Service wiring and the process lifecycle.
//!
//! # Design
//! - Production collaborators are chosen from [`AppConfig`]; tests inject
//!   their own [`PipelineDeps`] through [`AppContext::with_deps`].
//! - One [`ShutdownTrigger`] fans out to the HTTP server, the watcher, the
//!   audit drainer and every in-flight run.

use std::sync::Arc;

use cleanslate_adapters::{
    DisabledAuditLog, ExiftoolStripper, FirestoreAuditLog, FirestoreConfig, RcloneTransfer,
};
use cleanslate_api::{ApiServer, ApiState, ServiceSummary};
use cleanslate_config::AppConfig;
use cleanslate_core::AuditLog;
use cleanslate_events::EventBus;
use cleanslate_pipeline::{
    DirectoryWatcher, PipelineDeps, PipelineSettings, ProcessingPipeline, RequestDispatcher,
    Shutdown, ShutdownTrigger, WatcherSettings,
};
use cleanslate_telemetry::{LoggingConfig, Metrics};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Which surfaces a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// HTTP API only.
    Api,
    /// HTTP API plus the directory watcher.
    Daemon,
}

impl RunMode {
    /// Mode selected by the `DAEMON_MODE` toggle.
    #[must_use]
    pub const fn from_config(config: &AppConfig) -> Self {
        if config.daemon_mode {
            Self::Daemon
        } else {
            Self::Api
        }
    }
}

/// Build the production collaborators described by `config`.
///
/// # Errors
///
/// Returns an error when the Firestore sink is enabled but its credentials
/// cannot be loaded.
pub fn production_deps(config: &AppConfig) -> AppResult<PipelineDeps> {
    let audit: Arc<dyn AuditLog> = if config.audit.enabled {
        let firestore = FirestoreConfig::from_credentials(
            &config.audit.credentials_path,
            config.audit.access_token.clone(),
            config.audit.emulator_host.as_deref(),
            config.collaborator_timeout,
        )
        .map_err(|err| AppError::adapter("firestore.credentials", err))?;
        info!(project = %firestore.project_id, "firestore audit sink enabled");
        Arc::new(
            FirestoreAuditLog::new(firestore)
                .map_err(|err| AppError::adapter("firestore.client", err))?,
        )
    } else {
        info!("audit sink disabled");
        Arc::new(DisabledAuditLog)
    };
    Ok(PipelineDeps {
        transfer: Arc::new(RcloneTransfer::new(config.collaborator_timeout)),
        stripper: Arc::new(ExiftoolStripper::new(config.collaborator_timeout)),
        audit,
    })
}

/// Shared services for one process.
pub struct AppContext {
    config: AppConfig,
    events: EventBus,
    metrics: Metrics,
    pipeline: Arc<ProcessingPipeline>,
    trigger: ShutdownTrigger,
    shutdown: Shutdown,
}

impl AppContext {
    /// Wire the pipeline with production collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error when a collaborator or the metrics registry cannot be
    /// constructed.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let deps = production_deps(&config)?;
        Self::with_deps(config, deps)
    }

    /// Wire the pipeline with caller-supplied collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error when the metrics registry cannot be constructed.
    pub fn with_deps(config: AppConfig, deps: PipelineDeps) -> AppResult<Self> {
        let events = EventBus::new();
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let (trigger, shutdown) = Shutdown::channel();
        let pipeline = Arc::new(ProcessingPipeline::new(
            deps,
            PipelineSettings::from_config(&config),
            events.clone(),
            metrics.clone(),
            shutdown.clone(),
        ));
        Ok(Self {
            config,
            events,
            metrics,
            pipeline,
            trigger,
            shutdown,
        })
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Arc<ProcessingPipeline> {
        &self.pipeline
    }

    /// Dispatcher bound to the shared pipeline.
    #[must_use]
    pub fn dispatcher(&self) -> RequestDispatcher {
        RequestDispatcher::new(Arc::clone(&self.pipeline))
    }

    /// Handle that stops every service started by [`AppContext::run`].
    #[must_use]
    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    fn services(&self, mode: RunMode) -> ServiceSummary {
        ServiceSummary {
            daemon_mode: mode == RunMode::Daemon,
            watch_dir: self.config.watch.watch_dir.display().to_string(),
            output_dir: self.config.watch.output_dir.display().to_string(),
            remote: self.pipeline.settings().default_target.to_string(),
            audit_enabled: self.config.audit.enabled,
        }
    }

    /// Run the API (and the watcher in daemon mode) until shutdown fires,
    /// then let the audit queue drain one last time.
    ///
    /// # Errors
    ///
    /// Returns an error when the bind address is invalid, the watcher cannot
    /// prepare its directories, or the server fails.
    pub async fn run(self, mode: RunMode) -> AppResult<()> {
        let addr = self
            .config
            .api
            .bind_addr()
            .map_err(|err| AppError::config("api.bind_addr", err))?;

        let drainer = self
            .pipeline
            .audit_queue()
            .spawn_drainer(self.config.audit.retry_interval, self.shutdown.clone());

        let watcher = match mode {
            RunMode::Daemon => Some(self.spawn_watcher()?),
            RunMode::Api => None,
        };

        let state = Arc::new(ApiState::new(
            self.dispatcher(),
            self.events.clone(),
            self.metrics.clone(),
            self.config.upload_dir.clone(),
            self.services(mode),
        ));
        info!(%addr, ?mode, "CleanSlate services starting");
        let served = ApiServer::new(state)
            .serve(addr, self.shutdown.clone())
            .await;
        self.trigger.trigger();

        if let Some(watcher) = watcher {
            join("watcher", watcher).await?;
        }
        join("audit_drainer", drainer).await?;
        info!(pending_audit = self.pipeline.audit_queue().depth(), "CleanSlate services stopped");

        served.map_err(|err| AppError::ApiServer {
            operation: "api.serve",
            detail: format!("{err:#}"),
        })
    }

    fn spawn_watcher(&self) -> AppResult<JoinHandle<()>> {
        let watcher = DirectoryWatcher::new(
            Arc::clone(&self.pipeline),
            WatcherSettings::from_config(&self.config),
        )
        .map_err(|err| AppError::pipeline("watcher.new", err))?;
        Ok(tokio::spawn(watcher.run(self.shutdown.clone())))
    }
}

async fn join(task: &'static str, handle: JoinHandle<()>) -> AppResult<()> {
    handle.await.map_err(|source| {
        warn!(task, error = %source, "background task ended abnormally");
        AppError::Task { task, source }
    })
}

/// Trigger `trigger` on the first Ctrl-C.
pub fn shutdown_on_ctrl_c(trigger: ShutdownTrigger) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => warn!(error = %err, "failed to listen for shutdown signal"),
        }
        trigger.trigger();
    })
}

/// Entry point for the `CleanSlate` boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging or service startup fails.
pub async fn run_app() -> AppResult<()> {
    let config = AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    cleanslate_telemetry::init_logging(&LoggingConfig::for_verbosity(config.verbose_logging))
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let mode = RunMode::from_config(&config);
    let context = AppContext::from_config(config)?;
    let signal = shutdown_on_ctrl_c(context.trigger());
    let outcome = context.run(mode).await;
    signal.abort();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use cleanslate_test_support::{FakeStripper, FakeTransfer, RecordingAuditLog};

    fn config(root: &std::path::Path, daemon: bool) -> anyhow::Result<AppConfig> {
        let root = root.display().to_string();
        let mut config = AppConfig::from_lookup(|key| match key {
            "DAEMON_MODE" => Some(daemon.to_string()),
            "WATCH_DIR" => Some(format!("{root}/watch")),
            "OUTPUT_DIR" => Some(format!("{root}/clean")),
            "UPLOAD_DIR" => Some(format!("{root}/uploads")),
            "FIREBASE_ENABLED" => Some("false".into()),
            "API_HOST" => Some("127.0.0.1".into()),
            "WATCH_POLL_INTERVAL_MS" => Some("20".into()),
            "AUDIT_RETRY_INTERVAL_MS" => Some("20".into()),
            _ => None,
        })?;
        config.api.port = 0;
        Ok(config)
    }

    fn fake_deps() -> PipelineDeps {
        PipelineDeps {
            transfer: Arc::new(FakeTransfer::new()),
            stripper: Arc::new(FakeStripper::new()),
            audit: Arc::new(RecordingAuditLog::new()),
        }
    }

    #[test]
    fn run_mode_follows_daemon_toggle() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        assert_eq!(RunMode::from_config(&config(root.path(), true)?), RunMode::Daemon);
        assert_eq!(RunMode::from_config(&config(root.path(), false)?), RunMode::Api);
        Ok(())
    }

    #[test]
    fn production_deps_without_audit_use_disabled_sink() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let deps = production_deps(&config(root.path(), false)?);
        assert!(deps.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn daemon_stops_on_trigger_and_creates_directories() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let context = AppContext::with_deps(config(root.path(), true)?, fake_deps())?;
        let trigger = context.trigger();
        let summary = context.services(RunMode::Daemon);
        assert!(summary.daemon_mode);
        assert_eq!(summary.remote, "gdrive:backups");

        let handle = tokio::spawn(context.run(RunMode::Daemon));
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle).await???;

        assert!(root.path().join("watch").is_dir());
        assert!(root.path().join("clean").is_dir());
        Ok(())
    }
}
