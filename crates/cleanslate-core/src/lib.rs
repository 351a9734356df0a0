#![forbid(unsafe_code)]
#![warn(
    unused,
    dead_code,
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! Collaborator-agnostic domain model for the `CleanSlate` ingestion pipeline.
//!
//! The pipeline drives files through backup, metadata stripping, relocation and
//! audit. This crate owns the vocabulary shared by every layer: file identity,
//! metadata maps and their diff, remote references, transaction records, and
//! the traits the external collaborators implement.

pub mod error;
pub mod filetypes;
pub mod model;
pub mod service;

pub use error::{CollaboratorError, CollaboratorResult, ModelError, ModelResult};
pub use filetypes::{
    SUPPORTED_EXTENSIONS, ensure_supported, extension_of, is_supported, supported_list,
};
pub use model::{
    AuditStatus, FailureKind, FileIdentity, MetadataChange, MetadataMap, PipelineFailure,
    ProcessOptions, ProcessingResult, RecordId, RecordKind, RemoteRef, RemoteTarget,
    RemovedMetadata, RunState, Stage, StageRecord, StripOutcome, TransactionRecord,
    removed_metadata,
};
pub use service::{AuditLog, MetadataStripper, TransferClient};
