//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges the pipeline, watcher, and HTTP surface
//!   report; labels stay low-cardinality (stage names, status words, routes).

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    pipeline_stages_total: IntCounterVec,
    pipeline_runs_total: IntCounterVec,
    collaborator_retries_total: IntCounterVec,
    audit_queue_depth: IntGauge,
    audit_records_dropped_total: IntCounter,
    pipeline_in_flight: IntGauge,
    watcher_tracked_files: IntGauge,
}

/// Snapshot of selected gauges and counters for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Records currently waiting in the audit retry queue.
    pub audit_queue_depth: i64,
    /// Audit records discarded because the queue overflowed or failed fatally.
    pub audit_records_dropped_total: u64,
    /// Pipeline runs currently holding an identity lock.
    pub pipeline_in_flight: i64,
    /// Files currently tracked by the directory watcher.
    pub watcher_tracked_files: i64,
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<C>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}

fn counter_vec(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec> {
    let collector = IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

fn gauge(registry: &Registry, name: &'static str, help: &str) -> Result<IntGauge> {
    let collector = IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    register(registry, name, collector)
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            &registry,
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let events_emitted_total = counter_vec(
            &registry,
            "events_emitted_total",
            "Domain events emitted by type",
            &["type"],
        )?;
        let pipeline_stages_total = counter_vec(
            &registry,
            "pipeline_stages_total",
            "Pipeline stages executed by status",
            &["stage", "status"],
        )?;
        let pipeline_runs_total = counter_vec(
            &registry,
            "pipeline_runs_total",
            "Pipeline runs finished by outcome",
            &["outcome"],
        )?;
        let collaborator_retries_total = counter_vec(
            &registry,
            "collaborator_retries_total",
            "Retried collaborator calls by operation",
            &["operation"],
        )?;
        let audit_queue_depth = gauge(
            &registry,
            "audit_queue_depth",
            "Audit records waiting for a retry",
        )?;
        let audit_records_dropped_total = {
            let name = "audit_records_dropped_total";
            let collector = IntCounter::with_opts(Opts::new(name, "Audit records discarded"))
                .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
            register(&registry, name, collector)?
        };
        let pipeline_in_flight = gauge(
            &registry,
            "pipeline_in_flight",
            "Pipeline runs currently executing",
        )?;
        let watcher_tracked_files = gauge(
            &registry,
            "watcher_tracked_files",
            "Files tracked by the directory watcher",
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                events_emitted_total,
                pipeline_stages_total,
                pipeline_runs_total,
                collaborator_retries_total,
                audit_queue_depth,
                audit_records_dropped_total,
                pipeline_in_flight,
                watcher_tracked_files,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Increment the pipeline stage counter.
    pub fn inc_pipeline_stage(&self, stage: &str, status: &str) {
        self.inner
            .pipeline_stages_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Increment the finished-run counter for an outcome label.
    pub fn inc_pipeline_run(&self, outcome: &str) {
        self.inner
            .pipeline_runs_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the retry counter for a collaborator operation.
    pub fn inc_collaborator_retry(&self, operation: &str) {
        self.inner
            .collaborator_retries_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Set the audit retry queue depth gauge.
    pub fn set_audit_queue_depth(&self, depth: usize) {
        self.inner
            .audit_queue_depth
            .set(i64::try_from(depth).unwrap_or(i64::MAX));
    }

    /// Increment the dropped audit record counter.
    pub fn inc_audit_dropped(&self) {
        self.inner.audit_records_dropped_total.inc();
    }

    /// Adjust the in-flight pipeline gauge by `delta`.
    pub fn add_pipeline_in_flight(&self, delta: i64) {
        self.inner.pipeline_in_flight.add(delta);
    }

    /// Set the number of files tracked by the watcher.
    pub fn set_watcher_tracked(&self, count: usize) {
        self.inner
            .watcher_tracked_files
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            audit_queue_depth: self.inner.audit_queue_depth.get(),
            audit_records_dropped_total: self.inner.audit_records_dropped_total.get(),
            pipeline_in_flight: self.inner.pipeline_in_flight.get(),
            watcher_tracked_files: self.inner.watcher_tracked_files.get(),
        }
    }
}
