//! Domain types flowing through the pipeline.

mod identity;
mod metadata;
mod record;
mod remote;

pub use identity::FileIdentity;
pub use metadata::{MetadataChange, MetadataMap, RemovedMetadata, StripOutcome, removed_metadata};
pub use record::{
    AuditStatus, FailureKind, PipelineFailure, ProcessOptions, ProcessingResult, RecordId,
    RecordKind, RunState, Stage, StageRecord, TransactionRecord,
};
pub use remote::{RemoteRef, RemoteTarget};
