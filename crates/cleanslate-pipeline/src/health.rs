//! Degraded-component tracking surfaced through `/status` and health events.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use cleanslate_events::{Event, EventBus};
use tracing::{info, warn};

/// Component label for the remote transfer collaborator.
pub const COMPONENT_TRANSFER: &str = "transfer";
/// Component label for the audit sink.
pub const COMPONENT_AUDIT: &str = "audit";

/// Set of components currently considered degraded.
pub struct HealthRegistry {
    degraded: Mutex<BTreeSet<&'static str>>,
    events: EventBus,
}

impl HealthRegistry {
    /// Create an empty registry publishing changes on `events`.
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            degraded: Mutex::new(BTreeSet::new()),
            events,
        }
    }

    /// Flag `component` as degraded; publishes only on transitions.
    pub fn mark_degraded(&self, component: &'static str, detail: &str) {
        let snapshot = {
            let mut guard = self.lock();
            if !guard.insert(component) {
                return;
            }
            snapshot_of(&guard)
        };
        warn!(component, detail, "component degraded");
        let _ = self.events.publish(Event::HealthChanged { degraded: snapshot });
    }

    /// Clear the degraded flag for `component`; publishes only on transitions.
    pub fn mark_recovered(&self, component: &'static str) {
        let snapshot = {
            let mut guard = self.lock();
            if !guard.remove(component) {
                return;
            }
            snapshot_of(&guard)
        };
        info!(component, "component recovered");
        let _ = self.events.publish(Event::HealthChanged { degraded: snapshot });
    }

    /// Currently degraded components, sorted.
    #[must_use]
    pub fn degraded(&self) -> Vec<String> {
        snapshot_of(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<&'static str>> {
        self.degraded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn snapshot_of(set: &BTreeSet<&'static str>) -> Vec<String> {
    set.iter().map(|component| (*component).to_string()).collect()
}
