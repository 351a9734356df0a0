//! Per-identity admission control.
//!
//! At most one run per [`FileIdentity`] executes at a time. A caller that
//! arrives while a run is in flight waits for it and adopts its result when
//! the finished run has the same preview mode; otherwise it runs next.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cleanslate_core::{FileIdentity, ProcessingResult};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

type Gate = AsyncMutex<Option<ProcessingResult>>;

#[derive(Default)]
struct Slot {
    gate: Arc<Gate>,
    finished: AtomicU64,
}

/// Registry of identity slots shared by every front end.
#[derive(Default)]
pub(crate) struct IdentityLocks {
    slots: Mutex<HashMap<FileIdentity, Arc<Slot>>>,
}

/// Outcome of asking to run an identity.
pub(crate) enum Admission {
    /// The caller owns the identity until the permit is dropped.
    Run(RunPermit),
    /// A concurrent run finished while the caller waited.
    Adopted(ProcessingResult),
}

impl IdentityLocks {
    pub(crate) async fn admit(self: &Arc<Self>, identity: &FileIdentity, dry_run: bool) -> Admission {
        let handle = self.acquire_slot(identity);
        let seen = handle.slot.finished.load(Ordering::SeqCst);
        let guard = if let Ok(guard) = Arc::clone(&handle.slot.gate).try_lock_owned() {
            guard
        } else {
            debug!(identity = %identity, "waiting for in-flight run");
            let guard = Arc::clone(&handle.slot.gate).lock_owned().await;
            let finished_meanwhile = handle.slot.finished.load(Ordering::SeqCst) != seen;
            if finished_meanwhile
                && let Some(result) = guard.as_ref().filter(|result| result.dry_run == dry_run)
            {
                return Admission::Adopted(result.clone());
            }
            guard
        };
        Admission::Run(RunPermit {
            guard,
            handle,
        })
    }

    /// Identities with a run in flight or a caller waiting.
    pub(crate) fn active(&self) -> usize {
        self.lock_slots().len()
    }

    fn acquire_slot(self: &Arc<Self>, identity: &FileIdentity) -> SlotHandle {
        let slot = {
            let mut slots = self.lock_slots();
            Arc::clone(slots.entry(identity.clone()).or_default())
        };
        SlotHandle {
            identity: identity.clone(),
            slot,
            locks: Arc::clone(self),
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<FileIdentity, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reference to a slot; the last handle removes the map entry.
struct SlotHandle {
    identity: FileIdentity,
    slot: Arc<Slot>,
    locks: Arc<IdentityLocks>,
}

impl Drop for SlotHandle {
    fn drop(&mut self) {
        let mut slots = self.locks.lock_slots();
        // One reference is held by the map, one by this handle.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.identity);
        }
    }
}

/// Exclusive right to run an identity.
pub(crate) struct RunPermit {
    guard: OwnedMutexGuard<Option<ProcessingResult>>,
    handle: SlotHandle,
}

impl RunPermit {
    /// Publish the result to waiters and release the identity.
    pub(crate) fn complete(mut self, result: ProcessingResult) {
        *self.guard = Some(result);
        self.handle.slot.finished.fetch_add(1, Ordering::SeqCst);
    }
}
