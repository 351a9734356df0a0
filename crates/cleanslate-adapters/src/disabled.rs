//! Audit sink used when Firestore is turned off.

use async_trait::async_trait;
use cleanslate_core::{AuditLog, CollaboratorResult, RecordId, TransactionRecord};
use tracing::debug;

/// Record id returned for every record when auditing is disabled.
pub const DISABLED_RECORD_ID: &str = "firebase_disabled";

/// [`AuditLog`] that acknowledges records without storing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAuditLog;

#[async_trait]
impl AuditLog for DisabledAuditLog {
    async fn record(&self, record: &TransactionRecord) -> CollaboratorResult<RecordId> {
        debug!(run_id = %record.run_id, file = %record.file_name, "audit sink disabled; record not stored");
        Ok(DISABLED_RECORD_ID.to_string())
    }
}
