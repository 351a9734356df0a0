//! Collaborator traits implemented by adapters and test fakes.

use std::path::Path;

use async_trait::async_trait;

use crate::error::CollaboratorResult;
use crate::model::{MetadataMap, RecordId, RemoteRef, RemoteTarget, StripOutcome, TransactionRecord};

/// Remote backup collaborator (rclone in production).
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Upload `local` into `target`; re-uploading the same file is safe.
    async fn upload(&self, local: &Path, target: &RemoteTarget) -> CollaboratorResult<RemoteRef>;

    /// Produce a shareable URL for an uploaded object.
    async fn share_link(&self, remote: &RemoteRef) -> CollaboratorResult<String>;
}

/// Metadata collaborator (exiftool in production).
#[async_trait]
pub trait MetadataStripper: Send + Sync {
    /// Read metadata without modifying the file.
    async fn inspect(&self, path: &Path) -> CollaboratorResult<MetadataMap>;

    /// Remove metadata in place, reporting the maps on either side.
    ///
    /// A failed strip must leave the file unmodified.
    async fn strip(&self, path: &Path) -> CollaboratorResult<StripOutcome>;
}

/// Append-only audit sink.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist `record`; must be retriable without filesystem side effects.
    async fn record(&self, record: &TransactionRecord) -> CollaboratorResult<RecordId>;
}
