//! Shared state handed to every handler.

use std::path::PathBuf;

use cleanslate_events::EventBus;
use cleanslate_pipeline::RequestDispatcher;
use cleanslate_telemetry::Metrics;
use serde::Serialize;

/// Configured services reported by `/status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceSummary {
    /// Whether the directory watcher runs alongside the API.
    pub daemon_mode: bool,
    /// Watched directory.
    pub watch_dir: String,
    /// Output directory.
    pub output_dir: String,
    /// Default backup destination.
    pub remote: String,
    /// Whether audit records are written to Firestore.
    pub audit_enabled: bool,
}

/// Dependencies shared by the HTTP handlers.
pub struct ApiState {
    pub(crate) dispatcher: RequestDispatcher,
    pub(crate) events: EventBus,
    pub(crate) telemetry: Metrics,
    pub(crate) upload_dir: PathBuf,
    pub(crate) services: ServiceSummary,
}

impl ApiState {
    /// Assemble handler state.
    #[must_use]
    pub const fn new(
        dispatcher: RequestDispatcher,
        events: EventBus,
        telemetry: Metrics,
        upload_dir: PathBuf,
        services: ServiceSummary,
    ) -> Self {
        Self {
            dispatcher,
            events,
            telemetry,
            upload_dir,
            services,
        }
    }
}
