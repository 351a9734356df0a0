//! Best-effort delivery of transaction records to the audit sink.
//!
//! # Design
//! - Every record gets one inline write attempt so callers learn the outcome.
//! - Transient failures park the record in a bounded FIFO queue; when the
//!   queue is full the oldest record is dropped, logged and counted.
//! - A background drainer retries queued records on a fixed interval and
//!   performs a final drain on shutdown.
//! - Fatal failures are logged and discarded; retrying cannot help.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cleanslate_core::{AuditLog, AuditStatus, CollaboratorError, TransactionRecord};
use cleanslate_events::{Event, EventBus};
use cleanslate_telemetry::Metrics;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::health::{COMPONENT_AUDIT, HealthRegistry};
use crate::retry::with_timeout;
use crate::shutdown::Shutdown;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records the sink accepted.
    pub written: usize,
    /// Records discarded after a fatal failure.
    pub discarded: usize,
    /// Records still queued.
    pub remaining: usize,
}

/// Bounded retry queue in front of an [`AuditLog`].
pub struct AuditQueue {
    sink: Arc<dyn AuditLog>,
    pending: Mutex<VecDeque<TransactionRecord>>,
    capacity: usize,
    timeout: Duration,
    events: EventBus,
    metrics: Metrics,
    health: Arc<HealthRegistry>,
}

impl AuditQueue {
    /// Build a queue holding at most `capacity` records.
    #[must_use]
    pub fn new(
        sink: Arc<dyn AuditLog>,
        capacity: usize,
        timeout: Duration,
        events: EventBus,
        metrics: Metrics,
        health: Arc<HealthRegistry>,
    ) -> Self {
        Self {
            sink,
            pending: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
            timeout,
            events,
            metrics,
            health,
        }
    }

    /// Write `record`, queueing it when the sink fails transiently.
    pub async fn submit(&self, record: TransactionRecord) -> AuditStatus {
        match self.write(&record).await {
            Ok(record_id) => {
                debug!(run_id = %record.run_id, record_id = %record_id, "audit record stored");
                if self.depth() == 0 {
                    self.health.mark_recovered(COMPONENT_AUDIT);
                }
                AuditStatus::Recorded { record_id }
            }
            Err(err) if err.is_transient() => {
                warn!(
                    run_id = %record.run_id,
                    detail = err.detail(),
                    "audit sink unavailable; queueing record"
                );
                self.health.mark_degraded(COMPONENT_AUDIT, err.detail());
                self.enqueue(record);
                AuditStatus::Queued
            }
            Err(err) => {
                error!(
                    run_id = %record.run_id,
                    detail = err.detail(),
                    "audit record rejected; discarding"
                );
                AuditStatus::Failed {
                    reason: err.detail().to_string(),
                }
            }
        }
    }

    /// Retry queued records in order until the queue empties or the sink
    /// fails transiently again.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        while let Some(record) = self.pop_front() {
            match self.write(&record).await {
                Ok(record_id) => {
                    debug!(run_id = %record.run_id, record_id = %record_id, "queued audit record stored");
                    report.written += 1;
                }
                Err(err) if err.is_transient() => {
                    debug!(run_id = %record.run_id, detail = err.detail(), "audit sink still unavailable");
                    self.requeue_front(record);
                    break;
                }
                Err(err) => {
                    error!(
                        run_id = %record.run_id,
                        detail = err.detail(),
                        "queued audit record rejected; discarding"
                    );
                    report.discarded += 1;
                }
            }
        }
        report.remaining = self.depth();
        if report.remaining == 0 && report.written > 0 {
            self.health.mark_recovered(COMPONENT_AUDIT);
        }
        report
    }

    /// Number of queued records.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.lock_pending().len()
    }

    /// Spawn the periodic drainer; it drains once more after shutdown.
    pub fn spawn_drainer(self: Arc<Self>, every: Duration, mut shutdown: Shutdown) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.wait() => break,
                    _ = ticker.tick() => {
                        if self.depth() > 0 {
                            let report = self.drain().await;
                            debug!(?report, "audit drain pass");
                        }
                    }
                }
            }
            let report = self.drain().await;
            if report.remaining > 0 {
                warn!(remaining = report.remaining, "audit records undelivered at shutdown");
            } else {
                info!(written = report.written, "audit queue drained");
            }
        })
    }

    async fn write(&self, record: &TransactionRecord) -> Result<String, CollaboratorError> {
        with_timeout("audit", self.timeout, self.sink.record(record)).await
    }

    fn enqueue(&self, record: TransactionRecord) {
        let run_id = record.run_id;
        let (depth, dropped) = {
            let mut pending = self.lock_pending();
            let dropped = if pending.len() >= self.capacity {
                pending.pop_front()
            } else {
                None
            };
            pending.push_back(record);
            (pending.len(), dropped)
        };
        if let Some(dropped) = dropped {
            warn!(
                run_id = %dropped.run_id,
                capacity = self.capacity,
                "audit queue full; dropping oldest record"
            );
            self.metrics.inc_audit_dropped();
            let _ = self.events.publish(Event::AuditDropped {
                run_id: dropped.run_id,
                reason: "queue_full".to_string(),
            });
        }
        self.metrics.set_audit_queue_depth(depth);
        let _ = self.events.publish(Event::AuditQueued { run_id, depth });
    }

    fn pop_front(&self) -> Option<TransactionRecord> {
        let mut pending = self.lock_pending();
        let record = pending.pop_front();
        self.metrics.set_audit_queue_depth(pending.len());
        record
    }

    fn requeue_front(&self, record: TransactionRecord) {
        let mut pending = self.lock_pending();
        if pending.len() >= self.capacity {
            // Newer records arrived while draining; keep the queue bounded.
            if let Some(dropped) = pending.pop_front() {
                warn!(run_id = %dropped.run_id, "audit queue full; dropping oldest record");
                self.metrics.inc_audit_dropped();
            }
        }
        pending.push_front(record);
        self.metrics.set_audit_queue_depth(pending.len());
    }

    fn lock_pending(&self) -> MutexGuard<'_, VecDeque<TransactionRecord>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
